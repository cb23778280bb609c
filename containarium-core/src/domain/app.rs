use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A deployed application, backing a user container with its own
/// build/runtime lifecycle (§6: `apps` table, `app deploy|start|stop`).
///
/// The buildpack/Dockerfile machinery that produces the image this points
/// at is explicitly out of scope (§1); this crate only tracks the
/// resulting deployment's identity and state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    Deploying,
    Running,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub id: uuid::Uuid,
    pub name: String,
    pub container_name: String,
    pub state: AppState,
    pub image_reference: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}
