//! `quizbank-service`: HTTP surface over `quizbank-core`.
//!
//! Two route groups:
//! - `/api/v1/app`: public, read-only (chapters, answers, question search,
//!   chapter images).
//! - `/api/v1/manage`: behind HTTP Basic auth; full CRUD on chapters,
//!   questions and images.
//!
//! Handlers build repositories per request from the shared [`DataConfig`];
//! nothing is cached between requests.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderValue, Method};
use quizbank_core::{ChapterRepository, DataConfig, ImageLibrary, QuestionRepository, StoreError};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use crate::config::{AppConfig, ConfigLoader};
pub use crate::error::ApiError;

/// Shared, read-only handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn data(&self) -> &DataConfig {
        &self.config.data
    }

    pub fn chapters(&self) -> ChapterRepository {
        ChapterRepository::new(self.data())
    }

    pub fn questions(&self) -> QuestionRepository {
        QuestionRepository::new(self.data())
    }

    pub fn images(&self) -> ImageLibrary {
        ImageLibrary::new(&self.data().images_dir)
    }
}

/// Create the data and images directories and empty collections if absent.
pub fn ensure_data_layout(data: &DataConfig) -> Result<(), StoreError> {
    ChapterRepository::new(data).store().ensure_exists()?;
    QuestionRepository::new(data).store().ensure_exists()?;
    ImageLibrary::new(&data.images_dir).ensure_exists()
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ORIGIN]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);
    Router::new()
        .nest("/api/v1/app", routes::app::router())
        .nest("/api/v1/manage", routes::manage::router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
