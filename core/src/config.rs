//! Data-layer configuration.
//!
//! Passed explicitly into every repository; nothing in this crate reads
//! process environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{CHAPTERS_FILE, QUESTIONS_FILE};

/// Where the collections and images live, and how image URLs are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding `chapters.json` and `questions.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding the chapter PNG images.
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Prefix joined in front of an image filename to form its public URL.
    #[serde(default = "default_images_url")]
    pub images_url: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("dist/data")
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("dist/images")
}

fn default_images_url() -> String {
    "/api/v1/app/images/".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            images_dir: default_images_dir(),
            images_url: default_images_url(),
        }
    }
}

impl DataConfig {
    /// Config rooted at `root`: `root/data` and `root/images` (for tests and tooling).
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            data_dir: root.join("data"),
            images_dir: root.join("images"),
            images_url: default_images_url(),
        }
    }

    pub fn chapters_path(&self) -> PathBuf {
        self.data_dir.join(CHAPTERS_FILE)
    }

    pub fn questions_path(&self) -> PathBuf {
        self.data_dir.join(QUESTIONS_FILE)
    }
}
