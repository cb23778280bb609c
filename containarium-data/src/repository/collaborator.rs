use containarium_core::domain::Collaborator;
use containarium_core::{Event, EventPayload};
use containarium_events::EventBus;
use sqlx::PgPool;

use crate::error::DataError;

#[derive(sqlx::FromRow)]
struct CollaboratorRow {
    id: uuid::Uuid,
    container_name: String,
    owner_username: String,
    collaborator_username: String,
    account_name: String,
    ssh_public_key: String,
    has_sudo: bool,
    has_container_runtime: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    created_by: String,
}

impl From<CollaboratorRow> for Collaborator {
    fn from(row: CollaboratorRow) -> Self {
        Collaborator {
            id: row.id,
            container_name: row.container_name,
            owner_username: row.owner_username,
            collaborator_username: row.collaborator_username,
            account_name: row.account_name,
            ssh_public_key: row.ssh_public_key,
            has_sudo: row.has_sudo,
            has_container_runtime: row.has_container_runtime,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

const SELECT_COLUMNS: &str = r#"id, container_name, owner_username, collaborator_username,
                                 account_name, ssh_public_key, has_sudo, has_container_runtime,
                                 created_at, created_by"#;

/// Backed by `collaborators` (§4.L). `account_name` is globally unique —
/// the host account manager (B) uses it as the Unix username, so a
/// collision there is a real conflict, not just a datastore nicety.
pub struct CollaboratorRepository {
    pool: PgPool,
    events: EventBus,
}

impl CollaboratorRepository {
    pub fn new(pool: PgPool, events: EventBus) -> Self {
        CollaboratorRepository { pool, events }
    }

    pub async fn create(&self, collaborator: &Collaborator) -> Result<(), DataError> {
        sqlx::query(
            r#"
            INSERT INTO collaborators
                (id, container_name, owner_username, collaborator_username, account_name,
                 ssh_public_key, has_sudo, has_container_runtime, created_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(collaborator.id)
        .bind(&collaborator.container_name)
        .bind(&collaborator.owner_username)
        .bind(&collaborator.collaborator_username)
        .bind(&collaborator.account_name)
        .bind(&collaborator.ssh_public_key)
        .bind(collaborator.has_sudo)
        .bind(collaborator.has_container_runtime)
        .bind(collaborator.created_at)
        .bind(&collaborator.created_by)
        .execute(&self.pool)
        .await?;

        self.events
            .publish(Event::new(EventPayload::CollaboratorAdded {
                collaborator: collaborator.clone(),
            }));
        Ok(())
    }

    /// Idempotent: removing an already-absent collaborator is a no-op, not
    /// a `NotFound` (§4.L: "Deletion is idempotent").
    pub async fn remove(&self, id: uuid::Uuid) -> Result<(), DataError> {
        let result = sqlx::query("DELETE FROM collaborators WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            self.events
                .publish(Event::new(EventPayload::CollaboratorRemoved { id }));
        }
        Ok(())
    }

    /// Deleting the owning container deletes all its collaborators (§4.L).
    pub async fn remove_all_for_container(&self, container_name: &str) -> Result<(), DataError> {
        let ids: Vec<(uuid::Uuid,)> =
            sqlx::query_as("DELETE FROM collaborators WHERE container_name = $1 RETURNING id")
                .bind(container_name)
                .fetch_all(&self.pool)
                .await?;

        for (id,) in ids {
            self.events
                .publish(Event::new(EventPayload::CollaboratorRemoved { id }));
        }
        Ok(())
    }

    pub async fn list_for_container(
        &self,
        container_name: &str,
    ) -> Result<Vec<Collaborator>, DataError> {
        let query =
            format!("SELECT {SELECT_COLUMNS} FROM collaborators WHERE container_name = $1 ORDER BY created_at");
        let rows: Vec<CollaboratorRow> = sqlx::query_as(&query)
            .bind(container_name)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Collaborator::from).collect())
    }
}
