//! Runtime configuration.
//!
//! Everything the process needs is read from the environment exactly once
//! at startup into one [`Config`] value that travels inside the application
//! state — request handlers never consult the environment themselves, and
//! the session TTL, sweep interval, and image scale each live in exactly
//! one place.

use anyhow::Context;
use chrono::Duration;
use printworks_store::rows::KeyRow;
use printworks_store::{StoreError, TableStore};

/// Immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub bind_address: String,
    /// Public base URL used in feed links and absolute image URLs.
    pub public_base_url: String,
    /// Base URL of the table-store REST API.
    pub table_store_url: String,
    /// Table-store API token (`xc-token` header).
    pub table_store_token: String,
    /// Artwork table name.
    pub artwork_table: String,
    /// Icon table name.
    pub icon_table: String,
    /// Sessions table name.
    pub sessions_table: String,
    /// Mailing-list table name.
    pub subscribers_table: String,
    /// Deployment-keys table name.
    pub keys_table: String,
    /// Payment-processor secret key.
    pub processor_secret_key: String,
    /// Fixed session lifetime, measured from row creation.
    pub session_ttl: Duration,
    /// How often the expiry sweep runs.
    pub sweep_interval: std::time::Duration,
    /// Linear scale applied when re-encoding source images.
    pub image_scale: f32,
    /// Portal credentials.
    pub admin_username: String,
    /// Portal credentials.
    pub admin_password: String,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
    /// Directory served under `/static`.
    pub static_dir: String,
}

impl Config {
    /// Load the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Fails when a required variable is missing or a numeric variable does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        let session_ttl_minutes = env_parse("PRINTWORKS_SESSION_TTL_MINUTES", 15i64)?;
        let sweep_interval_minutes = env_parse("PRINTWORKS_SWEEP_INTERVAL_MINUTES", 30u64)?;
        let image_scale = env_parse("PRINTWORKS_IMAGE_SCALE", 0.8f32)?;

        Ok(Self {
            bind_address: env_or("PRINTWORKS_BIND_ADDRESS", "0.0.0.0:8000"),
            public_base_url: env_or("PRINTWORKS_PUBLIC_URL", "http://localhost:8000"),
            table_store_url: required("TABLE_STORE_URL")?,
            table_store_token: required("TABLE_STORE_TOKEN")?,
            artwork_table: env_or("TABLE_STORE_ARTWORK_TABLE", "artworks"),
            icon_table: env_or("TABLE_STORE_ICON_TABLE", "icons"),
            sessions_table: env_or("TABLE_STORE_SESSIONS_TABLE", "sessions"),
            subscribers_table: env_or("TABLE_STORE_SUBSCRIBERS_TABLE", "subscribers"),
            keys_table: env_or("TABLE_STORE_KEYS_TABLE", "keys"),
            processor_secret_key: env_or("PROCESSOR_SECRET_KEY", ""),
            session_ttl: Duration::minutes(session_ttl_minutes),
            sweep_interval: std::time::Duration::from_secs(sweep_interval_minutes * 60),
            image_scale,
            admin_username: env_or("PRINTWORKS_ADMIN_USERNAME", ""),
            admin_password: env_or("PRINTWORKS_ADMIN_PASSWORD", ""),
            allowed_origins: std::env::var("PRINTWORKS_ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect(),
            static_dir: env_or("PRINTWORKS_STATIC_DIR", "web/static"),
        })
    }

    /// Overlay secrets kept in the table-store keys table onto this
    /// configuration. Unknown key rows are ignored.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors from the key listing.
    pub async fn overlay_keys(mut self, store: &TableStore) -> Result<Self, StoreError> {
        let rows: Vec<KeyRow> = store.list_rows(&self.keys_table).await?;
        for row in rows {
            match row.envvar.as_str() {
                "processor_secret_key" => self.processor_secret_key = row.envval,
                "admin_username" => self.admin_username = row.envval,
                "admin_password" => self.admin_password = row.envval,
                other => tracing::debug!(key = other, "ignoring unrecognized key row"),
            }
        }
        Ok(self)
    }

    /// Confirm that every secret was provided, by environment or key row.
    ///
    /// # Errors
    ///
    /// Names the first missing secret.
    pub fn ensure_secrets(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("PROCESSOR_SECRET_KEY", &self.processor_secret_key),
            ("PRINTWORKS_ADMIN_USERNAME", &self.admin_username),
            ("PRINTWORKS_ADMIN_PASSWORD", &self.admin_password),
        ] {
            if value.is_empty() {
                anyhow::bail!("{name} is not set (environment or keys table)");
            }
        }
        Ok(())
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} is not set"))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{name} has an unparsable value")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A config pointing nowhere, for router-level tests.
    #[must_use]
    pub(crate) fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            public_base_url: "http://localhost:8000".to_string(),
            table_store_url: "http://table-store.invalid".to_string(),
            table_store_token: "test-token".to_string(),
            artwork_table: "artworks".to_string(),
            icon_table: "icons".to_string(),
            sessions_table: "sessions".to_string(),
            subscribers_table: "subscribers".to_string(),
            keys_table: "keys".to_string(),
            processor_secret_key: "sk_test".to_string(),
            session_ttl: Duration::minutes(15),
            sweep_interval: std::time::Duration::from_secs(1800),
            image_scale: 0.8,
            admin_username: "admin".to_string(),
            admin_password: "secret".to_string(),
            allowed_origins: Vec::new(),
            static_dir: "web/static".to_string(),
        }
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let config = test_config();
        assert_eq!(config.session_ttl, Duration::minutes(15));
        assert_eq!(config.sweep_interval.as_secs(), 1800);
        assert!(config.ensure_secrets().is_ok());
    }

    #[test]
    fn missing_secrets_are_named() {
        let mut config = test_config();
        config.admin_password = String::new();
        let error = config.ensure_secrets().unwrap_err().to_string();
        assert!(error.contains("PRINTWORKS_ADMIN_PASSWORD"));
    }

    #[tokio::test]
    async fn key_rows_overlay_secrets() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tables/keys/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": [
                    {"envvar": "processor_secret_key", "envval": "sk_from_table"},
                    {"envvar": "unrelated", "envval": "ignored"}
                ]
            })))
            .mount(&server)
            .await;

        let store = TableStore::new(server.uri(), "token");
        let config = test_config().overlay_keys(&store).await.unwrap();
        assert_eq!(config.processor_secret_key, "sk_from_table");
        assert_eq!(config.admin_username, "admin");
    }
}
