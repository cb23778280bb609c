use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ApiError;

/// `^[a-z0-9-]+$`, checked by [`super::super::validation::validate_container_name`].
pub const NAME_MAX_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Creating,
    Running,
    Stopped,
    Frozen,
    Error,
}

/// A container's role label. `User` containers are owned by a tenant;
/// `CoreDatastore`/`CoreProxy` are control-plane-owned (§4.D) and excluded
/// from user-facing listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    CoreDatastore,
    CoreProxy,
}

impl Role {
    pub fn is_core(self) -> bool {
        !matches!(self, Role::User)
    }

    pub fn label_value(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::CoreDatastore => "core-datastore",
            Role::CoreProxy => "core-proxy",
        }
    }
}

/// `None` fields mean "no change" in a resize request (§4.C); at least one
/// must be `Some` for the operation to be accepted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu_cores: Option<u32>,
    pub memory_bytes: Option<u64>,
    pub disk_bytes: Option<u64>,
}

impl ResourceLimits {
    pub fn is_empty(&self) -> bool {
        self.cpu_cores.is_none() && self.memory_bytes.is_none() && self.disk_bytes.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub owner: String,
    pub state: ContainerState,
    pub limits: ResourceLimits,
    pub primary_ip: Option<String>,
    pub labels: HashMap<String, String>,
    pub role: Role,
    /// Higher starts earlier; core services use this to win the race after
    /// a host reboot (§4.D).
    pub boot_priority: i32,
}

impl Container {
    /// The canonical name for a user's container: `{username}-container`.
    pub fn user_container_name(username: &str) -> String {
        format!("{username}-container")
    }

    /// The owning username, recovered from the canonical container name
    /// (inverse of [`Container::user_container_name`]). Returns `None` for
    /// system containers (the `_`-prefixed / core-role ones).
    pub fn owner_from_name(name: &str) -> Option<&str> {
        name.strip_suffix("-container")
    }

    pub fn is_user_owned(&self) -> bool {
        matches!(self.role, Role::User)
    }
}

/// System-reserved label-key prefixes; user label writes touching these are
/// rejected (§3: "certain reserved prefixes are system-controlled").
pub const RESERVED_LABEL_PREFIXES: &[&str] = &["containarium.role/", "containarium.boot/"];

pub fn validate_label_key(key: &str, allow_reserved: bool) -> Result<(), ApiError> {
    if !allow_reserved {
        for prefix in RESERVED_LABEL_PREFIXES {
            if key.starts_with(prefix) {
                return Err(ApiError::validation(format!(
                    "label key '{key}' uses a reserved prefix"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_container_name_format() {
        assert_eq!(Container::user_container_name("alice"), "alice-container");
    }

    #[test]
    fn owner_from_name_roundtrips() {
        let name = Container::user_container_name("bob");
        assert_eq!(Container::owner_from_name(&name), Some("bob"));
    }

    #[test]
    fn owner_from_name_rejects_system_containers() {
        assert_eq!(Container::owner_from_name("_datastore"), None);
    }

    #[test]
    fn reserved_label_prefix_rejected_for_user_writes() {
        let err = validate_label_key("containarium.role/x", false).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(validate_label_key("containarium.role/x", true).is_ok());
        assert!(validate_label_key("team", false).is_ok());
    }

    #[test]
    fn resource_limits_empty_means_no_change() {
        assert!(ResourceLimits::default().is_empty());
        let limits = ResourceLimits {
            cpu_cores: Some(2),
            ..Default::default()
        };
        assert!(!limits.is_empty());
    }
}
