use crate::error::SecurityError;

/// Shared CORS/WebSocket `Origin` allow-list (§4.H: "CORS mirrors the same
/// allow-list and must never default to wildcard"). Loaded from
/// `*_ALLOWED_ORIGINS` (CSV, §6) — deliberately has no "allow all" mode.
#[derive(Debug, Clone)]
pub struct OriginAllowList {
    origins: Vec<String>,
}

impl OriginAllowList {
    pub fn from_csv(csv: &str) -> Self {
        let origins = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        OriginAllowList { origins }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin)
    }

    /// Both the WebSocket upgrade and the bearer-token checks are mandatory
    /// (§4.H); this just covers the Origin half.
    pub fn require(&self, origin: Option<&str>) -> Result<(), SecurityError> {
        match origin {
            Some(o) if self.is_allowed(o) => Ok(()),
            _ => Err(SecurityError::OriginNotAllowed),
        }
    }

    pub fn as_header_values(&self) -> &[String] {
        &self.origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_and_trims_whitespace() {
        let list = OriginAllowList::from_csv("https://a.example, https://b.example");
        assert!(list.is_allowed("https://a.example"));
        assert!(list.is_allowed("https://b.example"));
        assert!(!list.is_allowed("https://evil.example"));
    }

    #[test]
    fn missing_origin_is_rejected() {
        let list = OriginAllowList::from_csv("https://a.example");
        assert!(list.require(None).is_err());
    }

    #[test]
    fn empty_allow_list_never_defaults_to_wildcard() {
        let list = OriginAllowList::from_csv("");
        assert!(!list.is_allowed("https://anything.example"));
    }
}
