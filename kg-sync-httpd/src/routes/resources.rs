//! Opaque resource documents: GET/PUT/DELETE /indexing/resources/:id

use crate::error::{Result, ServerError};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

/// GET /indexing/resources/:id
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state
        .service
        .get_resource(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("resource {}", id)))
}

/// PUT /indexing/resources/:id
pub async fn upsert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(resource): Json<Value>,
) -> Result<StatusCode> {
    state.service.upsert_resource(&id, &resource).await?;
    tracing::info!(%id, "resource stored");
    Ok(StatusCode::OK)
}

/// DELETE /indexing/resources/:id
///
/// Deleting a resource that does not exist succeeds.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.service.delete_resource(&id).await?;
    tracing::info!(%id, "resource removed");
    Ok(StatusCode::OK)
}
