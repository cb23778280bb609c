use containarium_core::domain::{L4Protocol, PassthroughRoute};
use containarium_core::{Event, EventPayload};
use containarium_events::EventBus;
use sqlx::PgPool;

use crate::error::DataError;

fn protocol_str(protocol: L4Protocol) -> &'static str {
    match protocol {
        L4Protocol::Tcp => "tcp",
        L4Protocol::Udp => "udp",
    }
}

fn protocol_from_str(s: &str) -> L4Protocol {
    match s {
        "udp" => L4Protocol::Udp,
        _ => L4Protocol::Tcp,
    }
}

#[derive(sqlx::FromRow)]
struct PassthroughRow {
    external_port: i32,
    protocol: String,
    target_ip: String,
    target_port: i32,
    description: String,
}

impl From<PassthroughRow> for PassthroughRoute {
    fn from(row: PassthroughRow) -> Self {
        PassthroughRoute {
            external_port: row.external_port as u16,
            target_ip: row.target_ip,
            target_port: row.target_port as u16,
            protocol: protocol_from_str(&row.protocol),
            description: row.description,
        }
    }
}

/// TCP/UDP passthrough table (§3, §4.E). Keyed by `(external_port,
/// protocol)`, same idempotent-upsert shape as [`super::route::RouteRepository`].
#[derive(Clone)]
pub struct PassthroughRepository {
    pool: PgPool,
    events: EventBus,
}

impl PassthroughRepository {
    pub fn new(pool: PgPool, events: EventBus) -> Self {
        PassthroughRepository { pool, events }
    }

    pub async fn upsert(&self, route: &PassthroughRoute) -> Result<(), DataError> {
        sqlx::query(
            r#"
            INSERT INTO passthrough_routes (external_port, protocol, target_ip, target_port, description)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_port, protocol) DO UPDATE SET
                target_ip = EXCLUDED.target_ip,
                target_port = EXCLUDED.target_port,
                description = EXCLUDED.description
            "#,
        )
        .bind(route.external_port as i32)
        .bind(protocol_str(route.protocol))
        .bind(&route.target_ip)
        .bind(route.target_port as i32)
        .bind(&route.description)
        .execute(&self.pool)
        .await?;

        self.events
            .publish(Event::new(EventPayload::PassthroughAdded {
                route: route.clone(),
            }));
        Ok(())
    }

    pub async fn delete(&self, external_port: u16, protocol: L4Protocol) -> Result<(), DataError> {
        let result = sqlx::query(
            "DELETE FROM passthrough_routes WHERE external_port = $1 AND protocol = $2",
        )
        .bind(external_port as i32)
        .bind(protocol_str(protocol))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!(
                "passthrough route {external_port}/{protocol:?}"
            )));
        }

        self.events
            .publish(Event::new(EventPayload::PassthroughDeleted {
                external_port,
                protocol: protocol_str(protocol).to_string(),
            }));
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<PassthroughRoute>, DataError> {
        let rows: Vec<PassthroughRow> = sqlx::query_as(
            "SELECT external_port, protocol, target_ip, target_port, description
             FROM passthrough_routes ORDER BY external_port",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PassthroughRoute::from).collect())
    }
}
