//! `quizbank-core`: the data layer behind the quizbank service.
//!
//! Chapters and questions live in two JSON array files under a data
//! directory; chapter images are PNG files in an images directory. Every
//! repository call loads the backing file, works on an in-memory snapshot
//! and rewrites the whole file on mutation. There is no cache between calls
//! and no cross-process locking: the last writer wins.
//!
//! ## Layout
//!
//! ```text
//! <data_dir>/chapters.json    [{ "chapter", "route", "image" }, ...]
//! <data_dir>/questions.json   [{ "chapter", "questionNumber", "title", ... }, ...]
//! <images_dir>/*.png
//! ```

pub mod case;
pub mod chapters;
pub mod config;
pub mod error;
pub mod images;
pub mod questions;
pub mod schema;
pub mod store;

pub use chapters::{Chapter, ChapterRepository, ChapterSummary, Image, JoinedChapter};
pub use config::DataConfig;
pub use error::{DataError, FieldErrors, NON_FIELD_ERROR, StoreError};
pub use images::{ImageLibrary, NewImage};
pub use questions::{
    AnswerSummary, Filters, JoinedQuestion, Question, QuestionMeta, QuestionRepository,
};
pub use store::{Record, RecordStore};

/// Filename of the chapter collection inside the data directory.
pub const CHAPTERS_FILE: &str = "chapters.json";

/// Filename of the question collection inside the data directory.
pub const QUESTIONS_FILE: &str = "questions.json";

/// Extension accepted for chapter images.
pub const IMAGE_EXTENSION: &str = "png";
