use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{require_api_key, CredentialSet, GuardState, ValidatedKey};
use crate::config::{AppConfig, CorsConfig};
use crate::error::Result as ApiResult;
use crate::estudiantes::{handler, map_error, EstudianteStore, HandlerError};

pub const API_NAME: &str = "Gestión de Estudiantes API";
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Whether a route sits behind the API key guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Protected,
}

/// Every prefix the estudiante CRUD handlers are mounted under.
pub const ESTUDIANTE_MOUNTS: [(&str, RouteClass); 3] = [
    ("/public/estudiantes", RouteClass::Public),
    ("/estudiantes", RouteClass::Protected),
    ("/android/estudiantes", RouteClass::Protected),
];

pub const DELETE_ALL_PATH: &str = "/estudiantes/admin/delete-all";
pub const DATABASE_INFO_PATH: &str = "/database-info";
pub const VERIFY_API_KEY_PATH: &str = "/verify-api-key";

/// Guarded routes that live outside the estudiante mounts.
pub const PROTECTED_ROUTES: [&str; 3] = [DELETE_ALL_PATH, DATABASE_INFO_PATH, VERIFY_API_KEY_PATH];

#[derive(Clone)]
pub struct AppState {
    store: Arc<EstudianteStore>,
    guard: GuardState,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn with_credentials(
        config: AppConfig,
        store: Arc<EstudianteStore>,
        credentials: Arc<CredentialSet>,
    ) -> ApiResult<Self> {
        let guard = GuardState::new(credentials, &config.auth)?;
        Ok(Self {
            store,
            guard,
            config: Arc::new(config),
        })
    }

    pub fn store(&self) -> &EstudianteStore {
        &self.store
    }

    pub fn guard(&self) -> &GuardState {
        &self.guard
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

fn mount_estudiantes(router: Router<AppState>, prefix: &str) -> Router<AppState> {
    let collection = || get(handler::list_estudiantes).post(handler::create_estudiante);
    router
        .route(prefix, collection())
        .route(&format!("{}/", prefix), collection())
        .route(
            &format!("{}/:id", prefix),
            get(handler::get_estudiante)
                .put(handler::update_estudiante)
                .delete(handler::delete_estudiante),
        )
}

pub fn build_router(state: AppState) -> Router {
    let mut public = Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/public-info", get(public_info));

    let mut protected = Router::new()
        .route(DELETE_ALL_PATH, delete(handler::delete_all_estudiantes))
        .route(DATABASE_INFO_PATH, get(database_info))
        .route(VERIFY_API_KEY_PATH, get(verify_api_key));

    for (prefix, class) in ESTUDIANTE_MOUNTS {
        match class {
            RouteClass::Public => public = mount_estudiantes(public, prefix),
            RouteClass::Protected => protected = mount_estudiantes(protected, prefix),
        }
    }

    let protected = protected.route_layer(middleware::from_fn_with_state(
        state.guard().clone(),
        require_api_key,
    ));

    let cors = cors_layer(&state.config().cors);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if cfg.allowed_origins.is_empty() {
        tracing::info!("CORS: Allowing all origins (*)");
        layer.allow_origin(Any)
    } else {
        tracing::info!("CORS: Restricting to {:?}", cfg.allowed_origins);
        layer.allow_origin(parse_origins(&cfg.allowed_origins))
    }
}

/// Parses configured origins, skipping (and logging) any that are not valid
/// header values.
pub fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "CORS: ignoring invalid origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        tracing::warn!("CORS: no valid origins configured, cross-origin requests will be refused");
    }
    parsed
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "Bienvenido a la API de estudiantes!" }))
}

async fn health(
    State(state): State<AppState>,
) -> Result<Json<Value>, HandlerError> {
    let stats = state.store().stats().map_err(map_error)?;
    Ok(Json(json!({
        "status": "healthy",
        "database": "connected",
        "table": crate::estudiantes::store::TREE_NAME,
        "total_estudiantes": stats.total_estudiantes,
    })))
}

async fn public_info() -> Json<Value> {
    let mut protected: Vec<&str> = ESTUDIANTE_MOUNTS
        .iter()
        .filter(|(_, class)| *class == RouteClass::Protected)
        .map(|(prefix, _)| *prefix)
        .collect();
    protected.extend(PROTECTED_ROUTES);

    Json(json!({
        "api_name": API_NAME,
        "version": API_VERSION,
        "requires_api_key": true,
        "api_key_required_for": protected,
    }))
}

async fn database_info(
    State(state): State<AppState>,
) -> Result<Json<Value>, HandlerError> {
    let stats = state.store().stats().map_err(map_error)?;
    Ok(Json(json!({
        "table_name": crate::estudiantes::store::TREE_NAME,
        "total_records": stats.total_estudiantes,
        "min_id": stats.min_id,
        "max_id": stats.max_id,
        "columns": ["id", "nombre", "edad", "email", "carrera", "created_at", "updated_at"],
        "api_version": API_VERSION,
        "security": "api_key_required",
    })))
}

async fn verify_api_key(Extension(key): Extension<ValidatedKey>) -> Json<Value> {
    Json(json!({
        "valid": true,
        "message": "API Key válida",
        "label": key.label(),
        "permissions": ["read:estudiantes", "write:estudiantes", "delete:estudiantes"],
    }))
}

pub async fn run_http_server(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config().server.host, state.config().server.port);
    let app = build_router(state);

    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
