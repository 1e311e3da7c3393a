//! Program detail page data.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Serialize;

use jbs_core::constants::DEFAULT_LOCALE;
use jbs_core::remote::ProgramRepository;
use jbs_core::workshop::{Workshop, WorkshopMapper};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{locale}/programs/global-communication/{slug}", get(program_page))
}

#[derive(Serialize)]
struct ProgramPage {
    workshop: Workshop,
    code: String,
}

/// GET /{locale}/programs/global-communication/{slug} - Workshop shown on a program page
///
/// Program codes are uppercase; any other spelling redirects to the canonical path.
async fn program_page(State(state): State<AppState>, Path((locale, slug)): Path<(String, String)>) -> Response {
    let locale = if locale.is_empty() { DEFAULT_LOCALE.to_string() } else { locale };
    let code = slug.to_uppercase();
    if slug != code {
        return Redirect::temporary(&format!("/{locale}/programs/global-communication/{code}")).into_response();
    }

    let workshop = match ProgramRepository::find_by_slug(&*state.records, &code).await {
        Ok(records) => WorkshopMapper::to_frontend(&records, &locale, &code),
        Err(e) => {
            tracing::error!(%code, "program page data fetch failed: {e}");
            Workshop::fallback()
        }
    };

    Json(ProgramPage { workshop, code }).into_response()
}
