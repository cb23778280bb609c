use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclPreset {
    FullIsolation,
    HttpOnly,
    Permissive,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Drop,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclRule {
    pub action: RuleAction,
    pub source_cidr: String,
    pub destination_cidr: String,
    /// Empty means "any port".
    pub destination_ports: Vec<u16>,
    pub protocol: String,
    pub description: String,
}

/// At most one `Acl` is attached to a container NIC at a time (§3 invariant)
/// — enforced by the lifecycle manager replacing, never appending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acl {
    pub name: String,
    pub preset: AclPreset,
    pub ingress: Vec<AclRule>,
    pub egress: Vec<AclRule>,
}

impl Acl {
    pub fn name_for(username: &str) -> String {
        format!("acl-{username}")
    }

    pub fn full_isolation(username: &str) -> Self {
        Acl {
            name: Self::name_for(username),
            preset: AclPreset::FullIsolation,
            ingress: vec![AclRule {
                action: RuleAction::Drop,
                source_cidr: "0.0.0.0/0".into(),
                destination_cidr: "0.0.0.0/0".into(),
                destination_ports: vec![],
                protocol: "all".into(),
                description: "deny all inbound".into(),
            }],
            egress: vec![AclRule {
                action: RuleAction::Allow,
                source_cidr: "0.0.0.0/0".into(),
                destination_cidr: "0.0.0.0/0".into(),
                destination_ports: vec![],
                protocol: "all".into(),
                description: "allow all outbound".into(),
            }],
        }
    }

    pub fn http_only(username: &str) -> Self {
        Acl {
            name: Self::name_for(username),
            preset: AclPreset::HttpOnly,
            ingress: vec![AclRule {
                action: RuleAction::Allow,
                source_cidr: "0.0.0.0/0".into(),
                destination_cidr: "0.0.0.0/0".into(),
                destination_ports: vec![80, 443],
                protocol: "tcp".into(),
                description: "allow http/https inbound".into(),
            }],
            egress: vec![AclRule {
                action: RuleAction::Allow,
                source_cidr: "0.0.0.0/0".into(),
                destination_cidr: "0.0.0.0/0".into(),
                destination_ports: vec![],
                protocol: "all".into(),
                description: "allow all outbound".into(),
            }],
        }
    }

    pub fn permissive(username: &str) -> Self {
        Acl {
            name: Self::name_for(username),
            preset: AclPreset::Permissive,
            ingress: vec![AclRule {
                action: RuleAction::Allow,
                source_cidr: "0.0.0.0/0".into(),
                destination_cidr: "0.0.0.0/0".into(),
                destination_ports: vec![],
                protocol: "all".into(),
                description: "allow all inbound".into(),
            }],
            egress: vec![AclRule {
                action: RuleAction::Allow,
                source_cidr: "0.0.0.0/0".into(),
                destination_cidr: "0.0.0.0/0".into(),
                destination_ports: vec![],
                protocol: "all".into(),
                description: "allow all outbound".into(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_name_format() {
        assert_eq!(Acl::name_for("alice"), "acl-alice");
    }

    #[test]
    fn full_isolation_drops_all_ingress() {
        let acl = Acl::full_isolation("alice");
        assert_eq!(acl.ingress.len(), 1);
        assert_eq!(acl.ingress[0].action, RuleAction::Drop);
    }
}
