//! The event envelope of §3/§4.G/§9: a tagged variant with one case per
//! event kind, serialising as `{"type": "...", ...}` via serde's adjacently
//! tagged representation (so `EventPayload::ContainerCreated` becomes
//! `{"type": "container.created", "container": {...}}`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Collaborator, Container, PassthroughRoute, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Container,
    Route,
    PassthroughRoute,
    Collaborator,
    App,
    Traffic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename = "container.created")]
    ContainerCreated { container: Container },
    #[serde(rename = "container.state_changed")]
    ContainerStateChanged {
        name: String,
        from: String,
        to: String,
    },
    #[serde(rename = "container.deleted")]
    ContainerDeleted { name: String },
    #[serde(rename = "route.added")]
    RouteAdded { route: Route },
    #[serde(rename = "route.deleted")]
    RouteDeleted { id: uuid::Uuid, full_domain: String },
    #[serde(rename = "passthrough.added")]
    PassthroughAdded { route: PassthroughRoute },
    #[serde(rename = "passthrough.deleted")]
    PassthroughDeleted { external_port: u16, protocol: String },
    #[serde(rename = "collaborator.added")]
    CollaboratorAdded { collaborator: Collaborator },
    #[serde(rename = "collaborator.removed")]
    CollaboratorRemoved { id: uuid::Uuid },
    #[serde(rename = "app.state_changed")]
    AppStateChanged {
        app_id: uuid::Uuid,
        from: String,
        to: String,
    },
    #[serde(rename = "traffic.sample")]
    TrafficSample {
        container_name: String,
        rx_bytes: u64,
        tx_bytes: u64,
    },
}

impl EventPayload {
    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            EventPayload::ContainerCreated { .. }
            | EventPayload::ContainerStateChanged { .. }
            | EventPayload::ContainerDeleted { .. } => ResourceKind::Container,
            EventPayload::RouteAdded { .. } | EventPayload::RouteDeleted { .. } => {
                ResourceKind::Route
            }
            EventPayload::PassthroughAdded { .. } | EventPayload::PassthroughDeleted { .. } => {
                ResourceKind::PassthroughRoute
            }
            EventPayload::CollaboratorAdded { .. } | EventPayload::CollaboratorRemoved { .. } => {
                ResourceKind::Collaborator
            }
            EventPayload::AppStateChanged { .. } => ResourceKind::App,
            EventPayload::TrafficSample { .. } => ResourceKind::Traffic,
        }
    }

    pub fn resource_id(&self) -> String {
        match self {
            EventPayload::ContainerCreated { container } => container.name.clone(),
            EventPayload::ContainerStateChanged { name, .. } => name.clone(),
            EventPayload::ContainerDeleted { name } => name.clone(),
            EventPayload::RouteAdded { route } => route.id.to_string(),
            EventPayload::RouteDeleted { id, .. } => id.to_string(),
            EventPayload::PassthroughAdded { route } => {
                format!("{}/{:?}", route.external_port, route.protocol)
            }
            EventPayload::PassthroughDeleted {
                external_port,
                protocol,
            } => format!("{external_port}/{protocol}"),
            EventPayload::CollaboratorAdded { collaborator } => collaborator.id.to_string(),
            EventPayload::CollaboratorRemoved { id } => id.to_string(),
            EventPayload::AppStateChanged { app_id, .. } => app_id.to_string(),
            EventPayload::TrafficSample { container_name, .. } => container_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: uuid::Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Event {
            id: uuid::Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.payload.resource_kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_deleted_tags_as_container_resource() {
        let event = Event::new(EventPayload::ContainerDeleted {
            name: "bob-container".into(),
        });
        assert_eq!(event.resource_kind(), ResourceKind::Container);
        assert_eq!(event.payload.resource_id(), "bob-container");
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::new(EventPayload::ContainerDeleted {
            name: "bob-container".into(),
        });
        let json = serde_json::to_value(&event.payload).unwrap();
        assert_eq!(json["type"], "container.deleted");
        assert_eq!(json["name"], "bob-container");
    }
}
