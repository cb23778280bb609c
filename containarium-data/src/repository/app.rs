use containarium_core::domain::{App, AppState};
use containarium_core::{Event, EventPayload};
use containarium_events::EventBus;
use sqlx::PgPool;

use crate::error::DataError;

fn state_str(state: AppState) -> &'static str {
    match state {
        AppState::Deploying => "deploying",
        AppState::Running => "running",
        AppState::Stopped => "stopped",
        AppState::Failed => "failed",
    }
}

fn state_from_str(s: &str) -> AppState {
    match s {
        "running" => AppState::Running,
        "stopped" => AppState::Stopped,
        "failed" => AppState::Failed,
        _ => AppState::Deploying,
    }
}

#[derive(sqlx::FromRow)]
struct AppRow {
    id: uuid::Uuid,
    name: String,
    container_name: String,
    state: String,
    image_reference: String,
    created_at: chrono::DateTime<chrono::Utc>,
    created_by: String,
}

impl From<AppRow> for App {
    fn from(row: AppRow) -> Self {
        App {
            id: row.id,
            name: row.name,
            container_name: row.container_name,
            state: state_from_str(&row.state),
            image_reference: row.image_reference,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, name, container_name, state, image_reference, created_at, created_by";

/// Backed by `apps` (§6). Deploy/start/stop/restart/delete all funnel
/// through [`AppRepository::set_state`] or [`AppRepository::create`]; the
/// buildpack/image-build step that produces `image_reference` is out of
/// scope here (§1).
pub struct AppRepository {
    pool: PgPool,
    events: EventBus,
}

impl AppRepository {
    pub fn new(pool: PgPool, events: EventBus) -> Self {
        AppRepository { pool, events }
    }

    pub async fn create(&self, app: &App) -> Result<(), DataError> {
        sqlx::query(
            r#"
            INSERT INTO apps (id, name, container_name, state, image_reference, created_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(app.id)
        .bind(&app.name)
        .bind(&app.container_name)
        .bind(state_str(app.state))
        .bind(&app.image_reference)
        .bind(app.created_at)
        .bind(&app.created_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_state(&self, id: uuid::Uuid, to: AppState) -> Result<(), DataError> {
        let previous: Option<(String,)> =
            sqlx::query_as("SELECT state FROM apps WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let from = previous
            .ok_or_else(|| DataError::NotFound(format!("app {id}")))?
            .0;

        sqlx::query("UPDATE apps SET state = $1 WHERE id = $2")
            .bind(state_str(to))
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.events.publish(Event::new(EventPayload::AppStateChanged {
            app_id: id,
            from,
            to: state_str(to).to_string(),
        }));
        Ok(())
    }

    pub async fn delete(&self, id: uuid::Uuid) -> Result<(), DataError> {
        let result = sqlx::query("DELETE FROM apps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("app {id}")));
        }
        Ok(())
    }

    pub async fn get(&self, id: uuid::Uuid) -> Result<App, DataError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM apps WHERE id = $1");
        let row: AppRow = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DataError::NotFound(format!("app {id}")))?;
        Ok(App::from(row))
    }

    pub async fn list(&self) -> Result<Vec<App>, DataError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM apps ORDER BY created_at");
        let rows: Vec<AppRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(App::from).collect())
    }
}
