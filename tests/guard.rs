use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    middleware,
    routing::post,
    Extension, Router,
};
use estudiantes_api::auth::{require_api_key, GuardState, ValidatedKey};
use estudiantes_api::config::{AppConfig, AuthConfig};
use estudiantes_api::{build_router, ApiError, AppState, CredentialSet, EstudianteStore};
use serde_json::{json, Value};
use tower::ServiceExt;

const KEY_HEADER: &str = "x-api-key";

fn counting_router(credentials: CredentialSet, hits: Arc<AtomicUsize>) -> Router {
    counting_router_with(credentials, &AuthConfig::default(), hits)
}

fn counting_router_with(
    credentials: CredentialSet,
    auth: &AuthConfig,
    hits: Arc<AtomicUsize>,
) -> Router {
    let guard = GuardState::new(Arc::new(credentials), auth).unwrap();
    Router::new()
        .route(
            "/operation",
            post(move |Extension(key): Extension<ValidatedKey>| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    key.label().to_string()
                }
            }),
        )
        .route_layer(middleware::from_fn_with_state(guard, require_api_key))
}

fn test_app(credentials: CredentialSet) -> (Router, AppState) {
    let db = sled::Config::new().temporary(true).open().unwrap();
    let store = Arc::new(EstudianteStore::open(&db).unwrap());
    let state =
        AppState::with_credentials(AppConfig::default(), store, Arc::new(credentials)).unwrap();
    (build_router(state.clone()), state)
}

fn alpha_beta() -> CredentialSet {
    CredentialSet::from_keys(["alpha", "beta"])
}

fn request(method: Method, uri: &str, key: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(KEY_HEADER, key);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn new_estudiante() -> Value {
    json!({ "nombre": "Juan Pérez", "edad": 25 })
}

#[tokio::test]
async fn valid_key_reaches_wrapped_operation() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = counting_router(alpha_beta(), Arc::clone(&hits));

    let response = app
        .oneshot(request(Method::POST, "/operation", Some("alpha"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "key-1");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_key_never_invokes_operation() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = counting_router(alpha_beta(), Arc::clone(&hits));

    let response = app
        .oneshot(request(Method::POST, "/operation", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "APIKey"
    );
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["details"]["reason"], "missing");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_case_key_is_rejected() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = counting_router(alpha_beta(), Arc::clone(&hits));

    let response = app
        .oneshot(request(Method::POST, "/operation", Some("ALPHA"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["details"]["reason"], "invalid");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unset_configuration_accepts_built_in_keys() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = counting_router(CredentialSet::from_config_value(None), Arc::clone(&hits));

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/operation", Some("desarrollo_key_2025"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "desarrollo");

    let response = app
        .oneshot(request(Method::POST, "/operation", Some("alpha"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn custom_header_name_is_honoured() {
    let hits = Arc::new(AtomicUsize::new(0));
    let auth = AuthConfig {
        header_name: "x-estudiantes-key".to_string(),
        ..AuthConfig::default()
    };
    let app = counting_router_with(alpha_beta(), &auth, Arc::clone(&hits));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/operation")
                .header("X-Estudiantes-Key", "alpha")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(Method::POST, "/operation", Some("alpha"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn unusable_header_name_fails_state_construction() {
    let db = sled::Config::new().temporary(true).open().unwrap();
    let store = Arc::new(EstudianteStore::open(&db).unwrap());
    let mut config = AppConfig::default();
    config.auth.header_name = "x api key".to_string();

    let result = AppState::with_credentials(config, store, Arc::new(alpha_beta()));
    assert!(matches!(result, Err(ApiError::ConfigError(_))));
}

#[tokio::test]
async fn rejected_write_leaves_store_untouched() {
    let (app, state) = test_app(alpha_beta());

    for key in [None, Some("ALPHA"), Some("gamma")] {
        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/estudiantes",
                key,
                Some(new_estudiante()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "key = {:?}", key);
    }

    assert_eq!(state.store().count(), 0);
}

#[tokio::test]
async fn rejection_happens_before_body_parsing() {
    let (app, _state) = test_app(alpha_beta());

    let response = app
        .oneshot(request(
            Method::POST,
            "/estudiantes",
            None,
            Some(json!({ "unexpected": true })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_mounts_accept_valid_key() {
    let (app, state) = test_app(alpha_beta());

    for uri in ["/estudiantes", "/estudiantes/", "/android/estudiantes"] {
        let response = app
            .clone()
            .oneshot(request(Method::POST, uri, Some("beta"), Some(new_estudiante())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED, "uri = {}", uri);
    }

    assert_eq!(state.store().count(), 3);
}

#[tokio::test]
async fn public_routes_ignore_key_header() {
    let (app, state) = test_app(alpha_beta());

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/public/estudiantes",
            Some("definitely-not-a-key"),
            Some(new_estudiante()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    for key in [None, Some("definitely-not-a-key"), Some("alpha")] {
        let response = app
            .clone()
            .oneshot(request(Method::GET, "/public/estudiantes", key, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "key = {:?}", key);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    for uri in ["/", "/health", "/public-info"] {
        let response = app
            .clone()
            .oneshot(request(Method::GET, uri, Some("bogus"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri = {}", uri);
    }

    assert_eq!(state.store().count(), 1);
}

#[tokio::test]
async fn verify_endpoint_echoes_label_behind_guard() {
    let (app, _state) = test_app(alpha_beta());

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/verify-api-key", Some("beta"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["label"], "key-2");

    let response = app
        .oneshot(request(Method::GET, "/verify-api-key", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_paths_are_not_found_rather_than_unauthorized() {
    let (app, _state) = test_app(alpha_beta());

    let response = app
        .oneshot(request(Method::GET, "/no-such-route", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_preflight_does_not_need_a_key() {
    let (app, _state) = test_app(alpha_beta());

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/estudiantes")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(preflight).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn configured_origins_skip_unparseable_entries() {
    let db = sled::Config::new().temporary(true).open().unwrap();
    let store = Arc::new(EstudianteStore::open(&db).unwrap());
    let mut config = AppConfig::default();
    config.cors.allowed_origins = vec![
        "https://estudiantes.example".to_string(),
        "bad\norigin".to_string(),
    ];
    assert_eq!(
        estudiantes_api::http::parse_origins(&config.cors.allowed_origins),
        vec!["https://estudiantes.example"]
    );

    let state = AppState::with_credentials(config, store, Arc::new(alpha_beta())).unwrap();
    let app = build_router(state);

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/estudiantes")
        .header(header::ORIGIN, "https://estudiantes.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(preflight).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://estudiantes.example"
    );
}
