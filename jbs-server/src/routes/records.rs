//! Read-only proxies over the FileMaker program and event layouts.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde_json::Value;

use jbs_core::JbsError;
use jbs_core::remote::{EventRepository, ProgramRepository};

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/fmp/records/programs/{slug}", get(program))
        .route("/api/fmp/records/events/{slug}", get(event))
}

/// GET /api/fmp/records/programs/{slug} - Raw program records
async fn program(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Vec<Value>>, AppError> {
    let records = ProgramRepository::find_by_slug(&*state.records, &slug).await?;
    if records.is_empty() {
        return Err(JbsError::NotFound("Program".into()).into());
    }
    Ok(Json(records))
}

/// GET /api/fmp/records/events/{slug} - Raw event records by id
async fn event(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Vec<Value>>, AppError> {
    let records = EventRepository::find_by_id(&*state.records, &id).await?;
    if records.is_empty() {
        return Err(JbsError::NotFound("Event".into()).into());
    }
    Ok(Json(records))
}
