use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::SecurityError;

/// Process-wide expiry cap, §4.I: "expiry enforced with a process-wide cap
/// (default 30 days, env-overridable)". The env var itself
/// (`*_MAX_TOKEN_EXPIRY_HOURS`) is read by whoever constructs this config —
/// this crate only enforces the number it's given.
pub const DEFAULT_MAX_TOKEN_EXPIRY_HOURS: i64 = 30 * 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub max_expiry_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        JwtConfig {
            secret: secret.into(),
            max_expiry_hours: DEFAULT_MAX_TOKEN_EXPIRY_HOURS,
        }
    }

    pub fn with_max_expiry_hours(mut self, hours: i64) -> Self {
        self.max_expiry_hours = hours;
        self
    }
}

/// Issues and validates HS256 bearer tokens under the §4.I expiry-cap rule.
pub struct JwtIssuer {
    config: JwtConfig,
}

impl JwtIssuer {
    pub fn new(config: JwtConfig) -> Self {
        JwtIssuer { config }
    }

    /// Rejects `expiry_hours <= 0` and `expiry_hours > max_expiry_hours`
    /// (§4.I, §8: "JWT with expiry ≤ 0 is rejected; JWT with expiry > cap
    /// is rejected").
    pub fn issue(&self, subject: &str, expiry_hours: i64) -> Result<String, SecurityError> {
        if expiry_hours <= 0 {
            return Err(SecurityError::NonPositiveExpiry(expiry_hours));
        }
        if expiry_hours > self.config.max_expiry_hours {
            return Err(SecurityError::ExpiryExceedsCap {
                requested: expiry_hours,
                cap: self.config.max_expiry_hours,
            });
        }

        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ChronoDuration::hours(expiry_hours)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(SecurityError::InvalidToken)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, SecurityError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(SecurityError::InvalidToken)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> JwtIssuer {
        JwtIssuer::new(JwtConfig::new("test-secret").with_max_expiry_hours(48))
    }

    #[test]
    fn issues_and_validates_a_token_roundtrip() {
        let issuer = issuer();
        let token = issuer.issue("alice", 24).unwrap();
        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.sub, "alice");
    }

    #[test]
    fn zero_or_negative_expiry_rejected() {
        let issuer = issuer();
        assert!(matches!(
            issuer.issue("alice", 0),
            Err(SecurityError::NonPositiveExpiry(0))
        ));
        assert!(matches!(
            issuer.issue("alice", -5),
            Err(SecurityError::NonPositiveExpiry(-5))
        ));
    }

    #[test]
    fn expiry_beyond_cap_rejected() {
        let issuer = issuer();
        assert!(matches!(
            issuer.issue("alice", 49),
            Err(SecurityError::ExpiryExceedsCap { requested: 49, cap: 48 })
        ));
    }

    #[test]
    fn tokens_signed_with_a_different_secret_are_rejected() {
        let issuer = issuer();
        let other = JwtIssuer::new(JwtConfig::new("different-secret"));
        let token = other.issue("alice", 24).unwrap();
        assert!(issuer.validate(&token).is_err());
    }
}
