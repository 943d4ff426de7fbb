use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::auth::ValidatedKey;
use crate::error::ApiError;
use crate::http::AppState;

use super::dto::{
    DeleteAllQuery, DeleteAllResponse, Estudiante, EstudianteInput, MessageResponse,
};
use super::helpers::{caller_label, map_error, ApiJson, ApiPath, HandlerError};

pub(crate) async fn list_estudiantes(
    State(state): State<AppState>,
) -> Result<Json<Vec<Estudiante>>, HandlerError> {
    state.store().list().map(Json).map_err(map_error)
}

pub(crate) async fn get_estudiante(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> Result<Json<Estudiante>, HandlerError> {
    state.store().get(id).map(Json).map_err(map_error)
}

pub(crate) async fn create_estudiante(
    State(state): State<AppState>,
    caller: Option<Extension<ValidatedKey>>,
    ApiJson(input): ApiJson<EstudianteInput>,
) -> Result<(StatusCode, Json<Estudiante>), HandlerError> {
    let estudiante = state.store().create(input).map_err(map_error)?;
    tracing::info!(
        id = estudiante.id,
        caller = caller_label(&caller),
        "Estudiante created"
    );
    Ok((StatusCode::CREATED, Json(estudiante)))
}

pub(crate) async fn update_estudiante(
    State(state): State<AppState>,
    caller: Option<Extension<ValidatedKey>>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(input): ApiJson<EstudianteInput>,
) -> Result<Json<Estudiante>, HandlerError> {
    let estudiante = state.store().update(id, input).map_err(map_error)?;
    tracing::info!(id, caller = caller_label(&caller), "Estudiante updated");
    Ok(Json(estudiante))
}

pub(crate) async fn delete_estudiante(
    State(state): State<AppState>,
    caller: Option<Extension<ValidatedKey>>,
    ApiPath(id): ApiPath<u64>,
) -> Result<Json<MessageResponse>, HandlerError> {
    state.store().delete(id).map_err(map_error)?;
    tracing::info!(id, caller = caller_label(&caller), "Estudiante deleted");
    Ok(Json(MessageResponse {
        mensaje: "Estudiante eliminado exitosamente".to_string(),
    }))
}

pub(crate) async fn delete_all_estudiantes(
    State(state): State<AppState>,
    Extension(caller): Extension<ValidatedKey>,
    Query(query): Query<DeleteAllQuery>,
) -> Result<Json<DeleteAllResponse>, HandlerError> {
    if !query.confirmacion {
        return Err(map_error(ApiError::ConfirmationRequired));
    }

    let removed = state.store().delete_all().map_err(map_error)?;
    tracing::warn!(removed, caller = caller.label(), "All estudiantes deleted");
    Ok(Json(DeleteAllResponse {
        mensaje: "Todos los estudiantes eliminados".to_string(),
        eliminados: removed,
        restantes: state.store().count(),
    }))
}
