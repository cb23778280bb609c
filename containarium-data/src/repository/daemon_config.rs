use containarium_core::domain::DaemonConfig;
use sqlx::PgPool;

use crate::error::DataError;

/// Key-value table backing [`DaemonConfig`] (§4.J). Stored as individual
/// rows rather than one JSON blob so an operator can inspect or patch a
/// single field with plain SQL during a recovery.
pub struct DaemonConfigRepository {
    pool: PgPool,
}

impl DaemonConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        DaemonConfigRepository { pool }
    }

    /// Returns defaults if the table is empty (first boot).
    pub async fn load(&self) -> Result<DaemonConfig, DataError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM daemon_config").fetch_all(&self.pool).await?;

        let mut config = DaemonConfig::default();
        for (key, value) in rows {
            apply_field(&mut config, &key, &value);
        }
        Ok(config)
    }

    /// Writes back the effective config after a successful bind (§4.J).
    pub async fn save(&self, config: &DaemonConfig) -> Result<(), DataError> {
        let fields: [(&str, String); 7] = [
            ("base_domain", config.base_domain.clone()),
            ("http_port", config.http_port.to_string()),
            ("grpc_port", config.grpc_port.to_string()),
            ("listen_address", config.listen_address.clone()),
            ("enable_mtls", config.enable_mtls.to_string()),
            ("enable_rest", config.enable_rest.to_string()),
            ("enable_app_hosting", config.enable_app_hosting.to_string()),
        ];

        let mut tx = self.pool.begin().await?;
        for (key, value) in fields {
            sqlx::query(
                r#"
                INSERT INTO daemon_config (key, value) VALUES ($1, $2)
                ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
                "#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn apply_field(config: &mut DaemonConfig, key: &str, value: &str) {
    match key {
        "base_domain" => config.base_domain = value.to_string(),
        "http_port" => {
            if let Ok(port) = value.parse() {
                config.http_port = port;
            }
        }
        "grpc_port" => {
            if let Ok(port) = value.parse() {
                config.grpc_port = port;
            }
        }
        "listen_address" => config.listen_address = value.to_string(),
        "enable_mtls" => config.enable_mtls = value == "true",
        "enable_rest" => config.enable_rest = value == "true",
        "enable_app_hosting" => config.enable_app_hosting = value == "true",
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_are_ignored_rather_than_erroring() {
        let mut config = DaemonConfig::default();
        let before = config.clone();
        apply_field(&mut config, "some_future_field", "whatever");
        assert_eq!(config, before);
    }

    #[test]
    fn boolean_fields_parse_from_their_string_form() {
        let mut config = DaemonConfig::default();
        apply_field(&mut config, "enable_mtls", "true");
        assert!(config.enable_mtls);
    }
}
