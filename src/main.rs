use anyhow::{Context, Result};
use estudiantes_api::auth::{CredentialSet, CredentialSource};
use estudiantes_api::http;
use estudiantes_api::{AppConfig, AppState, EstudianteStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "estudiantes_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env for local dev (if present)
    if dotenvy::dotenv().is_ok() {
        tracing::info!("Loaded .env");
    }

    tracing::info!("Starting Estudiantes API");

    let config = match std::env::var("ESTUDIANTES_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)
            .with_context(|| format!("failed to load config file {}", path))?,
        Err(_) => AppConfig::from_env().context("failed to load configuration")?,
    };
    tracing::info!(
        "Configuration loaded: host={}, port={}, db={}",
        config.server.host,
        config.server.port,
        config.database.path
    );

    let db = sled::open(&config.database.path).context("failed to open sled database")?;
    let store = Arc::new(EstudianteStore::open(&db).context("failed to open estudiantes tree")?);
    tracing::info!("Estudiantes stored: {}", store.count());

    // Keys must be in place before the listener accepts anything
    let credentials = Arc::new(CredentialSet::new(&config.auth));
    match credentials.source() {
        CredentialSource::Configured => {
            tracing::info!("API keys: {} configured", credentials.len())
        }
        CredentialSource::BuiltIn => {
            tracing::warn!("API keys: using {} built-in keys", credentials.len())
        }
    }
    tracing::info!("API key header: {}", config.auth.header_name);

    let state = AppState::with_credentials(config, store, credentials)
        .context("invalid auth configuration")?;
    http::run_http_server(state).await?;

    tracing::info!("Estudiantes API shutting down");
    Ok(())
}
