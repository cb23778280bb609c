use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ApiError;

pub const ACCOUNT_NAME_MAX_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: uuid::Uuid,
    pub container_name: String,
    pub owner_username: String,
    pub collaborator_username: String,
    pub account_name: String,
    pub ssh_public_key: String,
    pub has_sudo: bool,
    pub has_container_runtime: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Collaborator {
    /// `{container}-{collab}`, validated to fit [`ACCOUNT_NAME_MAX_LEN`]
    /// (§3, §4.B, §8's per-pair length property).
    pub fn account_name(container_name: &str, collaborator_username: &str) -> Result<String, ApiError> {
        let name = format!("{container_name}-{collaborator_username}");
        if name.len() > ACCOUNT_NAME_MAX_LEN {
            return Err(ApiError::validation(format!(
                "collaborator account name '{name}' exceeds {ACCOUNT_NAME_MAX_LEN} characters"
            )));
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_name_joins_container_and_collaborator() {
        let name = Collaborator::account_name("alice-container", "bob").unwrap();
        assert_eq!(name, "alice-container-bob");
    }

    #[test]
    fn account_name_rejects_overlong_pairs() {
        let container = "a".repeat(20) + "-container";
        let collaborator = "b".repeat(20);
        assert!(Collaborator::account_name(&container, &collaborator).is_err());
    }

    proptest::proptest! {
        #[test]
        fn account_name_never_exceeds_limit_when_accepted(
            container in "[a-z]{1,40}",
            collaborator in "[a-z]{1,40}",
        ) {
            if let Ok(name) = Collaborator::account_name(&container, &collaborator) {
                proptest::prop_assert!(name.len() <= ACCOUNT_NAME_MAX_LEN);
            }
        }
    }
}
