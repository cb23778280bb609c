use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::DataError;

/// Cold-boot retry policy for connecting to the datastore container before
/// it has finished starting (§4.D: "N retries (e.g., 5) with fixed interval
/// (e.g., 3 s)").
const CONNECT_RETRIES: u32 = 5;
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Connects with the §4.D cold-boot retry policy, then runs migrations.
pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, DataError> {
    let pool = connect_with_retry(database_url).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|err| DataError::Query(sqlx::Error::Migrate(Box::new(err))))?;
    Ok(pool)
}

async fn connect_with_retry(database_url: &str) -> Result<PgPool, DataError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                info!(attempt, "connected to datastore");
                return Ok(pool);
            }
            Err(err) if attempt < CONNECT_RETRIES => {
                warn!(attempt, error = %err, "datastore connection failed, retrying");
                tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
            }
            Err(err) => return Err(DataError::Connection(err)),
        }
    }
}
