use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// When true, `POST /api/backup/report` rejects submissions whose
    /// `apiKey` field is missing or fails validation.
    #[serde(default)]
    pub require_api_key: bool,

    /// CORS allowed origins; empty allows all origins (development mode).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    /// Default item count for `GET /api/recent-alerts`.
    #[serde(default = "default_recent_alerts_limit")]
    pub recent_alerts_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL. When unset, a SQLite database inside
    /// `data_dir` is used.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("sqlite://{}/backmon.db?mode=rwc", self.data_dir),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: None,
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            http_port: default_http_port(),
            database: DatabaseConfig::default(),
            require_api_key: false,
            cors_allowed_origins: Vec::new(),
            recent_alerts_limit: default_recent_alerts_limit(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_recent_alerts_limit() -> usize {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_port, 8080);
        assert!(!config.require_api_key);
        assert_eq!(config.recent_alerts_limit, 5);
        assert_eq!(config.database.connection_url(), "sqlite://data/backmon.db?mode=rwc");
    }

    #[test]
    fn explicit_database_url_wins() {
        let config: ServerConfig = toml::from_str(
            "http_port = 9000\n[database]\nurl = \"postgres://backmon@db/backmon\"\n",
        )
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(
            config.database.connection_url(),
            "postgres://backmon@db/backmon"
        );
    }
}
