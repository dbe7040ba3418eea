//! Management routes under `/api/v1/manage`, all behind Basic auth.

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use quizbank_core::{Chapter, Filters, NewImage, Question};
use serde_json::{Value, json};

use crate::AppState;
use crate::auth::require_basic_auth;
use crate::error::ApiError;

/// Multipart part name carrying both the keep list and the uploads.
const IMAGES_PART: &str = "images";

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/chapters", get(list_chapters).put(replace_chapters))
        .route("/routes", get(list_routes))
        .route(
            "/images",
            get(list_images).put(reconcile_images).post(reconcile_images),
        )
        .route("/questions", get(list_questions).post(add_question))
        .route(
            "/questions/:question_id",
            get(get_question).put(update_question).delete(delete_question),
        )
        .route_layer(middleware::from_fn_with_state(state, require_basic_auth))
}

fn parse_payload(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::malformed(format!("Invalid JSON: {e}")))
}

async fn list_chapters(State(state): State<AppState>) -> Result<Json<Vec<Chapter>>, ApiError> {
    Ok(Json(state.chapters().list()?))
}

async fn replace_chapters(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<Chapter>>, ApiError> {
    let payload = parse_payload(&body)?;
    Ok(Json(state.chapters().replace_all(&payload)?))
}

async fn list_routes(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.chapters().routes()?))
}

async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.images().list()?))
}

/// Text parts named `images` are kept; file parts named `images` are written.
/// Every other listed image is deleted.
async fn reconcile_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut keep = Vec::new();
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::malformed(e.body_text()))?
    {
        if field.name() != Some(IMAGES_PART) {
            continue;
        }
        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::malformed(e.body_text()))?;
                uploads.push(NewImage::new(filename, bytes.to_vec()));
            }
            None => {
                let name = field
                    .text()
                    .await
                    .map_err(|e| ApiError::malformed(e.body_text()))?;
                keep.push(name);
            }
        }
    }

    state.images().reconcile(&keep, &uploads)?;
    Ok(Json(json!({})))
}

async fn list_questions(State(state): State<AppState>) -> Result<Json<Vec<Question>>, ApiError> {
    Ok(Json(state.questions().list(&Filters::new(), false)?))
}

async fn add_question(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Question>), ApiError> {
    let payload = parse_payload(&body)?;
    let question = state.questions().add(&payload)?;
    Ok((StatusCode::CREATED, Json(question)))
}

async fn get_question(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<Json<Question>, ApiError> {
    Ok(Json(state.questions().get(&question_id)?))
}

async fn update_question(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
    body: Bytes,
) -> Result<Json<Question>, ApiError> {
    let payload = parse_payload(&body)?;
    Ok(Json(state.questions().update(&question_id, &payload)?))
}

async fn delete_question(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.questions().delete(&question_id)?;
    Ok(StatusCode::NO_CONTENT)
}
