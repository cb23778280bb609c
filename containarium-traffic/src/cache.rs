use dashmap::DashMap;

use containarium_core::EventPayload;

/// Container-IP → container-name cache, refreshed on container events
/// rather than re-queried from the runtime on every sampling tick (§4.M).
#[derive(Default)]
pub struct IpNameCache {
    by_ip: DashMap<String, String>,
}

impl IpNameCache {
    pub fn new() -> Self {
        IpNameCache::default()
    }

    pub fn name_for(&self, ip: &str) -> Option<String> {
        self.by_ip.get(ip).map(|v| v.clone())
    }

    pub fn apply_event(&self, payload: &EventPayload) {
        match payload {
            EventPayload::ContainerCreated { container } => {
                if let Some(ip) = &container.primary_ip {
                    self.by_ip.insert(ip.clone(), container.name.clone());
                }
            }
            EventPayload::ContainerDeleted { name } => {
                self.by_ip.retain(|_, v| v != name);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use containarium_core::domain::{Container, ContainerState, ResourceLimits, Role};
    use std::collections::HashMap;

    fn container(name: &str, ip: &str) -> Container {
        Container {
            name: name.to_string(),
            owner: "alice".into(),
            state: ContainerState::Running,
            limits: ResourceLimits::default(),
            primary_ip: Some(ip.to_string()),
            labels: HashMap::new(),
            role: Role::User,
            boot_priority: 0,
        }
    }

    #[test]
    fn created_event_populates_the_cache() {
        let cache = IpNameCache::new();
        cache.apply_event(&EventPayload::ContainerCreated {
            container: container("alice-container", "10.0.0.5"),
        });
        assert_eq!(cache.name_for("10.0.0.5"), Some("alice-container".to_string()));
    }

    #[test]
    fn deleted_event_evicts_every_ip_for_that_name() {
        let cache = IpNameCache::new();
        cache.apply_event(&EventPayload::ContainerCreated {
            container: container("alice-container", "10.0.0.5"),
        });
        cache.apply_event(&EventPayload::ContainerDeleted {
            name: "alice-container".into(),
        });
        assert_eq!(cache.name_for("10.0.0.5"), None);
    }
}
