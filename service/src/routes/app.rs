//! Public read-only routes under `/api/v1/app`.

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use quizbank_core::{AnswerSummary, ChapterSummary, Filters, JoinedQuestion};

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chapters", get(list_chapters))
        .route("/questions", get(list_answers))
        .route("/questions/find", get(find_question))
        .route("/images/:filename", get(get_image))
}

async fn list_chapters(State(state): State<AppState>) -> Result<Json<Vec<ChapterSummary>>, ApiError> {
    Ok(Json(state.chapters().summaries()?))
}

async fn list_answers(State(state): State<AppState>) -> Result<Json<Vec<AnswerSummary>>, ApiError> {
    Ok(Json(state.questions().answers()?))
}

/// Query keys may be camelCase or snake_case; dotted paths reach into the
/// joined chapter, e.g. `?chapter.route=de-gouden-eeuw&questionNumber=2`.
async fn find_question(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<JoinedQuestion>, ApiError> {
    let filters: Filters = params.into_iter().collect();
    Ok(Json(state.questions().find(&filters)?))
}

async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.images().read(&filename)?;
    Ok(([(CONTENT_TYPE, "image/png")], bytes))
}
