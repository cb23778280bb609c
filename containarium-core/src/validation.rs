//! Name-validation rules shared by the API layer, the lifecycle manager,
//! and the host account manager. Kept dependency-free (no `regex` crate) —
//! these are simple enough to hand-roll, and it keeps this crate's
//! dependency footprint small for something every other crate links.

use crate::domain::container::NAME_MAX_LEN;
use crate::ApiError;

/// `^[a-z0-9-]+$`, `len <= 63`, first char not `_` (§3, §8).
///
/// User-supplied names additionally may not start with `_` (reserved for
/// system containers); this is the same rule, just phrased twice in the
/// spec for emphasis, so it's one check here.
pub fn validate_container_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.len() > NAME_MAX_LEN {
        return Err(ApiError::validation(format!(
            "container name must be 1..={NAME_MAX_LEN} characters, got {}",
            name.len()
        )));
    }
    if name.starts_with('_') {
        return Err(ApiError::validation(
            "container name must not start with '_' (reserved for system containers)",
        ));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(ApiError::validation(
            "container name must match ^[a-z0-9-]+$",
        ));
    }
    Ok(())
}

/// Letters, digits, `-`, `_`; length 1..32; first char not a digit or `-`
/// (§4.B).
pub fn validate_unix_username(name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.len() > 32 {
        return Err(ApiError::validation(format!(
            "username must be 1..=32 characters, got {}",
            name.len()
        )));
    }
    let mut chars = name.chars();
    let first = chars.next().expect("checked non-empty above");
    if first.is_ascii_digit() || first == '-' {
        return Err(ApiError::validation(
            "username must not start with a digit or '-'",
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "username must contain only letters, digits, '-', or '_'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_container_names() {
        assert!(validate_container_name("alice-container").is_ok());
        assert!(validate_container_name("a").is_ok());
        assert!(validate_container_name(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn rejects_overlong_names() {
        assert!(validate_container_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn rejects_uppercase_and_underscore_prefix() {
        assert!(validate_container_name("Alice").is_err());
        assert!(validate_container_name("_datastore").is_err());
        assert!(validate_container_name("alice_container").is_err());
    }

    #[test]
    fn username_rejects_leading_digit_or_dash() {
        assert!(validate_unix_username("1bob").is_err());
        assert!(validate_unix_username("-bob").is_err());
        assert!(validate_unix_username("bob").is_ok());
        assert!(validate_unix_username("bob_2").is_ok());
    }

    proptest::proptest! {
        #[test]
        fn accepted_container_names_always_match_invariant(name in "[a-z0-9-]{1,63}") {
            if !name.starts_with('_') {
                proptest::prop_assert!(validate_container_name(&name).is_ok());
            }
        }
    }
}
