use crate::auth::parse_key_list;
use crate::error::{ApiError, Result};
use axum::http::HeaderName;
use serde::{Deserialize, Serialize};

/// Canonical variable holding the comma-separated API keys.
pub const API_KEYS_VAR: &str = "API_KEYS";
/// Older single-name variable; only consulted when `API_KEYS` is unset.
pub const LEGACY_API_KEYS_VAR: &str = "API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    // Empty means "use the built-in keys"
    #[serde(default)]
    pub allowed_keys: Vec<String>,
    pub header_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    // Empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                path: "estudiantes_db".to_string(),
            },
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allowed_keys: vec![],
            header_name: "x-api-key".to_string(),
        }
    }
}

impl AuthConfig {
    /// The configured key header, parsed. Fails when the name could never
    /// appear on a request.
    pub fn header(&self) -> Result<HeaderName> {
        HeaderName::from_bytes(self.header_name.as_bytes())
            .map_err(|_| ApiError::config_error("Invalid ESTUDIANTES_AUTH_HEADER"))
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from defaults overridden by whatever `lookup`
    /// returns for each known variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("ESTUDIANTES_HOST") {
            if !host.trim().is_empty() {
                config.server.host = host.trim().to_string();
            }
        }

        if let Some(port) = lookup("ESTUDIANTES_PORT") {
            config.server.port = port
                .trim()
                .parse()
                .map_err(|_| ApiError::config_error("Invalid ESTUDIANTES_PORT"))?;
        }

        if let Some(path) = lookup("ESTUDIANTES_DB_PATH") {
            if !path.trim().is_empty() {
                config.database.path = path;
            }
        }

        match lookup(API_KEYS_VAR) {
            Some(keys) => config.auth.allowed_keys = parse_key_list(&keys),
            None => {
                if let Some(keys) = lookup(LEGACY_API_KEYS_VAR) {
                    tracing::warn!(
                        "{} is deprecated, use {} instead",
                        LEGACY_API_KEYS_VAR,
                        API_KEYS_VAR
                    );
                    config.auth.allowed_keys = parse_key_list(&keys);
                }
            }
        }

        if let Some(header_name) = lookup("ESTUDIANTES_AUTH_HEADER") {
            if !header_name.trim().is_empty() {
                config.auth.header_name = header_name.trim().to_lowercase();
            }
        }
        config.auth.header()?;

        if let Some(origins) = lookup("CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ApiError::config_error(format!("Failed to read config file: {}", e)))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| ApiError::config_error(format!("Failed to parse config file: {}", e)))?;
        config.auth.header()?;

        Ok(config)
    }
}
