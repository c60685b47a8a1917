//! Synchronization endpoints under /indexing
//!
//! Every batch endpoint takes the lifecycle stage as `?databaseScope=`
//! (`IN_PROGRESS` or `RELEASED`). A run that completes without record errors
//! answers 200 with an empty body; record errors are returned as the error
//! report with status 500.

use crate::error::{Result, ServerError};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use kg_sync_protocol::{ErrorReportResult, ParseStageError, Stage};
use kg_sync_service::TypeFilter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

#[derive(Debug, Deserialize)]
pub struct ScopeParams {
    #[serde(rename = "databaseScope")]
    pub database_scope: String,
}

impl ScopeParams {
    fn stage(&self) -> Result<Stage> {
        self.database_scope
            .parse()
            .map_err(|e: ParseStageError| ServerError::bad_request(e.to_string()))
    }
}

fn respond(report: ErrorReportResult) -> Result<StatusCode> {
    if report.is_empty() {
        Ok(StatusCode::OK)
    } else {
        Err(ServerError::RecordErrors(report))
    }
}

async fn run(
    state: &AppState,
    params: &ScopeParams,
    filter: TypeFilter,
    full: bool,
) -> Result<StatusCode> {
    let stage = params.stage()?;
    let span = tracing::info_span!("indexing", %stage, ?filter, full);
    let report = async {
        if full {
            state.service.full_replacement(stage, filter).await
        } else {
            state.service.incremental_update(stage, filter).await
        }
    }
    .instrument(span)
    .await?;
    respond(report)
}

/// POST /indexing
pub async fn full_replacement(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScopeParams>,
) -> Result<StatusCode> {
    run(&state, &params, TypeFilter::NonAutoReleased, true).await
}

/// PUT /indexing
pub async fn incremental_update(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScopeParams>,
) -> Result<StatusCode> {
    run(&state, &params, TypeFilter::NonAutoReleased, false).await
}

/// POST /indexing/categories/:type
pub async fn full_replacement_for_type(
    State(state): State<Arc<AppState>>,
    Path(target_type): Path<String>,
    Query(params): Query<ScopeParams>,
) -> Result<StatusCode> {
    run(&state, &params, TypeFilter::Type(target_type), true).await
}

/// PUT /indexing/categories/:type
pub async fn incremental_update_for_type(
    State(state): State<Arc<AppState>>,
    Path(target_type): Path<String>,
    Query(params): Query<ScopeParams>,
) -> Result<StatusCode> {
    run(&state, &params, TypeFilter::Type(target_type), false).await
}

/// POST /indexing/autorelease
pub async fn full_replacement_auto_release(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScopeParams>,
) -> Result<StatusCode> {
    run(&state, &params, TypeFilter::AutoReleased, true).await
}

/// PUT /indexing/autorelease
pub async fn incremental_update_auto_release(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScopeParams>,
) -> Result<StatusCode> {
    run(&state, &params, TypeFilter::AutoReleased, false).await
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub uploaded: usize,
}

/// POST /indexing/queries
pub async fn upload_queries(State(state): State<Arc<AppState>>) -> Result<Json<UploadResponse>> {
    let uploaded = state.service.upload_queries().await?;
    Ok(Json(UploadResponse { uploaded }))
}
