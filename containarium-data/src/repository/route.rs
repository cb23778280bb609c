use containarium_core::domain::{HttpProtocol, Route};
use containarium_core::{Event, EventPayload};
use containarium_events::EventBus;
use sqlx::PgPool;

use crate::error::DataError;

/// Durable routes table (§4.E). Upsert is idempotent by `full_domain`;
/// every mutation emits an event so the reconciler and SSE/WS subscribers
/// see it without polling.
#[derive(Clone)]
pub struct RouteRepository {
    pool: PgPool,
    events: EventBus,
}

fn protocol_str(protocol: HttpProtocol) -> &'static str {
    match protocol {
        HttpProtocol::Http => "http",
        HttpProtocol::Grpc => "grpc",
    }
}

fn protocol_from_str(s: &str) -> HttpProtocol {
    match s {
        "grpc" => HttpProtocol::Grpc,
        _ => HttpProtocol::Http,
    }
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: uuid::Uuid,
    subdomain: String,
    full_domain: String,
    target_ip: String,
    target_port: i32,
    protocol: String,
    active: bool,
    owner_app_id: Option<uuid::Uuid>,
    description: String,
    created_at: chrono::DateTime<chrono::Utc>,
    created_by: String,
}

impl From<RouteRow> for Route {
    fn from(row: RouteRow) -> Self {
        Route {
            id: row.id,
            subdomain: row.subdomain,
            full_domain: row.full_domain,
            target_ip: row.target_ip,
            target_port: row.target_port as u16,
            protocol: protocol_from_str(&row.protocol),
            active: row.active,
            owner_app_id: row.owner_app_id,
            description: row.description,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

const SELECT_COLUMNS: &str = r#"id, subdomain, full_domain, target_ip, target_port, protocol,
                                 active, owner_app_id, description, created_at, created_by"#;

impl RouteRepository {
    pub fn new(pool: PgPool, events: EventBus) -> Self {
        RouteRepository { pool, events }
    }

    /// Idempotent by `full_domain` (§4.E). A second upsert with the same
    /// `full_domain` replaces the row atomically rather than erroring.
    pub async fn upsert(&self, route: &Route) -> Result<(), DataError> {
        sqlx::query(
            r#"
            INSERT INTO routes
                (id, subdomain, full_domain, target_ip, target_port, protocol,
                 active, owner_app_id, description, created_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (full_domain) DO UPDATE SET
                subdomain = EXCLUDED.subdomain,
                target_ip = EXCLUDED.target_ip,
                target_port = EXCLUDED.target_port,
                protocol = EXCLUDED.protocol,
                active = EXCLUDED.active,
                owner_app_id = EXCLUDED.owner_app_id,
                description = EXCLUDED.description
            "#,
        )
        .bind(route.id)
        .bind(&route.subdomain)
        .bind(&route.full_domain)
        .bind(&route.target_ip)
        .bind(route.target_port as i32)
        .bind(protocol_str(route.protocol))
        .bind(route.active)
        .bind(route.owner_app_id)
        .bind(&route.description)
        .bind(route.created_at)
        .bind(&route.created_by)
        .execute(&self.pool)
        .await?;

        self.events.publish(Event::new(EventPayload::RouteAdded {
            route: route.clone(),
        }));
        Ok(())
    }

    pub async fn delete(&self, id: uuid::Uuid) -> Result<(), DataError> {
        let full_domain: Option<(String,)> =
            sqlx::query_as("DELETE FROM routes WHERE id = $1 RETURNING full_domain")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let full_domain = full_domain
            .ok_or_else(|| DataError::NotFound(format!("route {id}")))?
            .0;

        self.events
            .publish(Event::new(EventPayload::RouteDeleted { id, full_domain }));
        Ok(())
    }

    pub async fn get(&self, id: uuid::Uuid) -> Result<Route, DataError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM routes WHERE id = $1");
        let row: RouteRow = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DataError::NotFound(format!("route {id}")))?;
        Ok(Route::from(row))
    }

    pub async fn list(&self) -> Result<Vec<Route>, DataError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM routes ORDER BY created_at");
        let rows: Vec<RouteRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Route::from).collect())
    }

    /// Routes referring to a container are deleted alongside it (§3's
    /// container-deletion invariant); keyed by `target_ip` since that's
    /// what the lifecycle manager has on hand at delete time.
    pub async fn delete_by_target_ip(&self, target_ip: &str) -> Result<Vec<uuid::Uuid>, DataError> {
        let rows: Vec<(uuid::Uuid, String)> = sqlx::query_as(
            "DELETE FROM routes WHERE target_ip = $1 RETURNING id, full_domain",
        )
        .bind(target_ip)
        .fetch_all(&self.pool)
        .await?;

        let ids = rows.iter().map(|(id, _)| *id).collect();
        for (id, full_domain) in rows {
            self.events
                .publish(Event::new(EventPayload::RouteDeleted { id, full_domain }));
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_roundtrips_through_its_string_form() {
        assert_eq!(protocol_from_str(protocol_str(HttpProtocol::Http)), HttpProtocol::Http);
        assert_eq!(protocol_from_str(protocol_str(HttpProtocol::Grpc)), HttpProtocol::Grpc);
    }
}
