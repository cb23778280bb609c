use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DataError;

/// One sampling interval's connection-tracking aggregate for a container
/// (§4.M).
#[derive(Debug, Clone)]
pub struct TrafficSample {
    pub container_name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub sampled_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TrafficRow {
    container_name: String,
    rx_bytes: i64,
    tx_bytes: i64,
    sampled_at: DateTime<Utc>,
}

impl From<TrafficRow> for TrafficSample {
    fn from(row: TrafficRow) -> Self {
        TrafficSample {
            container_name: row.container_name,
            rx_bytes: row.rx_bytes as u64,
            tx_bytes: row.tx_bytes as u64,
            sampled_at: row.sampled_at,
        }
    }
}

/// Append-only `traffic_history` (§4.M, §6). The collector writes here on
/// every sampling tick; nothing else does.
pub struct TrafficRepository {
    pool: PgPool,
}

impl TrafficRepository {
    pub fn new(pool: PgPool) -> Self {
        TrafficRepository { pool }
    }

    pub async fn record(&self, sample: &TrafficSample) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO traffic_history (container_name, rx_bytes, tx_bytes, sampled_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&sample.container_name)
        .bind(sample.rx_bytes as i64)
        .bind(sample.tx_bytes as i64)
        .bind(sample.sampled_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn recent_for_container(
        &self,
        container_name: &str,
        limit: i64,
    ) -> Result<Vec<TrafficSample>, DataError> {
        let rows: Vec<TrafficRow> = sqlx::query_as(
            r#"SELECT container_name, rx_bytes, tx_bytes, sampled_at
               FROM traffic_history
               WHERE container_name = $1
               ORDER BY sampled_at DESC
               LIMIT $2"#,
        )
        .bind(container_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TrafficSample::from).collect())
    }
}
