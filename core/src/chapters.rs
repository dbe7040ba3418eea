//! Chapter collection: the ordered list of quiz chapters.
//!
//! File order is meaningful. A chapter's 1-based position in the file drives
//! question numbering, so replacing the collection can renumber questions on
//! their next write.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::case::snake_keys;
use crate::config::DataConfig;
use crate::error::{DataError, FieldErrors, StoreError};
use crate::images::ImageLibrary;
use crate::schema::{Field, Schema, one_of, pattern};
use crate::store::{Record, RecordStore};

/// A named group of questions with a URL slug and a representative image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Display name; questions reference their chapter by this value.
    pub chapter: String,
    pub route: String,
    /// Bare filename inside the image library.
    pub image: String,
}

impl Record for Chapter {
    const KIND: &'static str = "chapter";

    fn key(&self) -> &str {
        &self.chapter
    }
}

/// Image reference resolved to a public URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub url: String,
}

/// Chapter with its image joined in. Read-time only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedChapter {
    pub chapter: String,
    pub route: String,
    pub image: Image,
}

/// Public listing shape: display name and slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub chapter: String,
    pub route: String,
}

impl Chapter {
    pub fn summary(&self) -> ChapterSummary {
        ChapterSummary {
            chapter: self.chapter.clone(),
            route: self.route.clone(),
        }
    }

    /// ChapterToImage join: `images_url` + bare filename.
    pub fn join_image(&self, images_url: &str) -> JoinedChapter {
        JoinedChapter {
            chapter: self.chapter.clone(),
            route: self.route.clone(),
            image: Image {
                url: format!("{images_url}{}", self.image),
            },
        }
    }
}

#[allow(clippy::expect_used)] // constant pattern
fn route_pattern() -> &'static Regex {
    static ROUTE: OnceLock<Regex> = OnceLock::new();
    ROUTE.get_or_init(|| Regex::new("^[a-z0-9-]+$").expect("valid route pattern"))
}

fn chapter_schema(images: Vec<String>) -> Schema {
    Schema::new(vec![
        Field::string("chapter"),
        Field::string("route").check(pattern(route_pattern())),
        Field::string("image").check(one_of(images)),
    ])
}

pub struct ChapterRepository {
    store: RecordStore<Chapter>,
    images: ImageLibrary,
    images_url: String,
}

impl ChapterRepository {
    pub fn new(config: &DataConfig) -> Self {
        Self {
            store: RecordStore::new(config.chapters_path()),
            images: ImageLibrary::new(&config.images_dir),
            images_url: config.images_url.clone(),
        }
    }

    pub fn store(&self) -> &RecordStore<Chapter> {
        &self.store
    }

    /// All chapters in file order.
    pub fn list(&self) -> Result<Vec<Chapter>, StoreError> {
        self.store.load()
    }

    pub fn summaries(&self) -> Result<Vec<ChapterSummary>, StoreError> {
        Ok(self.list()?.iter().map(Chapter::summary).collect())
    }

    /// Display names in file order.
    pub fn chapter_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list()?.into_iter().map(|c| c.chapter).collect())
    }

    /// Route slugs in file order.
    pub fn routes(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list()?.into_iter().map(|c| c.route).collect())
    }

    /// Look up a chapter by display name.
    pub fn get(&self, name: &str) -> Result<Chapter, DataError> {
        self.list()?
            .into_iter()
            .find(|c| c.chapter == name)
            .ok_or_else(|| DataError::ChapterNotFound {
                chapter: name.to_string(),
            })
    }

    pub fn join_image(&self, chapter: &Chapter) -> JoinedChapter {
        chapter.join_image(&self.images_url)
    }

    pub fn images_url(&self) -> &str {
        &self.images_url
    }

    /// Validate and write a whole new chapter list.
    ///
    /// `body` is `{ "chapters": [ ... ] }`; keys may be camelCase or
    /// snake_case. Each element
    /// is validated on its own; errors come back keyed `chapters.<index>.<field>`.
    /// Nothing is written unless every element is valid.
    pub fn replace_all(&self, body: &Value) -> Result<Vec<Chapter>, DataError> {
        let body = snake_keys(body.clone());
        let candidates = match body.get("chapters") {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => {
                let mut errors = FieldErrors::new();
                errors.insert("chapters", "Required");
                return Err(errors.into());
            }
            Some(other) => {
                let mut errors = FieldErrors::new();
                errors.insert("chapters", format!("\"{other}\" is not iterable"));
                return Err(errors.into());
            }
        };

        let schema = chapter_schema(self.images.list()?);
        let mut errors = FieldErrors::new();
        let mut chapters = Vec::with_capacity(candidates.len());
        let mut seen_names = HashSet::new();
        let mut seen_routes = HashSet::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let prefix = format!("chapters.{index}");
            match schema.deserialize(candidate) {
                Ok(values) => {
                    let chapter = Chapter {
                        chapter: values.string("chapter").unwrap_or_default(),
                        route: values.string("route").unwrap_or_default(),
                        image: values.string("image").unwrap_or_default(),
                    };
                    if !seen_names.insert(chapter.chapter.clone()) {
                        errors.insert(format!("{prefix}.chapter"), "Duplicate chapter");
                    }
                    if !seen_routes.insert(chapter.route.clone()) {
                        errors.insert(format!("{prefix}.route"), "Duplicate route");
                    }
                    chapters.push(chapter);
                }
                Err(element_errors) => errors.extend_prefixed(&prefix, element_errors),
            }
        }

        if !errors.is_empty() {
            tracing::warn!(errors = errors.len(), "rejected chapter list");
            return Err(errors.into());
        }

        self.store.save(&chapters)?;
        tracing::info!(count = chapters.len(), "replaced chapters");
        Ok(chapters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup() -> (tempfile::TempDir, ChapterRepository) {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = DataConfig::rooted_at(tmp.path());
        std::fs::create_dir_all(&config.data_dir).unwrap();
        std::fs::create_dir_all(&config.images_dir).unwrap();
        for image in ["beeldenstorm.png", "nachtwacht.png"] {
            std::fs::write(config.images_dir.join(image), b"\x89PNG").unwrap();
        }
        std::fs::write(
            config.chapters_path(),
            r#"[
  {"chapter": "Opstand en oorlog", "route": "opstand-en-oorlog", "image": "beeldenstorm.png"},
  {"chapter": "De Gouden Eeuw", "route": "de-gouden-eeuw", "image": "nachtwacht.png"}
]"#,
        )
        .unwrap();
        (tmp, ChapterRepository::new(&config))
    }

    #[test]
    fn projections_follow_file_order() {
        let (_tmp, repo) = setup();
        assert_eq!(
            repo.chapter_names().unwrap(),
            vec!["Opstand en oorlog", "De Gouden Eeuw"]
        );
        assert_eq!(
            repo.routes().unwrap(),
            vec!["opstand-en-oorlog", "de-gouden-eeuw"]
        );
        assert_eq!(
            repo.summaries().unwrap()[1],
            ChapterSummary {
                chapter: "De Gouden Eeuw".to_string(),
                route: "de-gouden-eeuw".to_string(),
            }
        );
    }

    #[test]
    fn join_image_builds_url() {
        let (_tmp, repo) = setup();
        let chapter = repo.get("De Gouden Eeuw").unwrap();
        let joined = repo.join_image(&chapter);
        assert_eq!(joined.image.url, "/api/v1/app/images/nachtwacht.png");
        assert_eq!(
            serde_json::to_value(&joined).unwrap(),
            json!({
                "chapter": "De Gouden Eeuw",
                "route": "de-gouden-eeuw",
                "image": {"url": "/api/v1/app/images/nachtwacht.png"}
            })
        );
    }

    #[test]
    fn get_unknown_chapter_is_not_found() {
        let (_tmp, repo) = setup();
        assert!(matches!(
            repo.get("Onbekend"),
            Err(DataError::ChapterNotFound { .. })
        ));
    }

    #[test]
    fn replace_all_writes_valid_list() {
        let (_tmp, repo) = setup();
        let saved = repo
            .replace_all(&json!({"chapters": [
                {"chapter": "Opstand en oorlog", "route": "opstand-en-oorlog", "image": "beeldenstorm.png"},
                {"chapter": "De Gouden Eeuw", "route": "de-gouden-eeuw", "image": "nachtwacht.png"},
                {"chapter": "Patriciërs en patriotten", "route": "patriciers-en-patriotten", "image": "nachtwacht.png"}
            ]}))
            .unwrap();

        assert_eq!(saved.len(), 3);
        assert_eq!(repo.chapter_names().unwrap().len(), 3);
        assert_eq!(repo.routes().unwrap()[2], "patriciers-en-patriotten");
        let written = std::fs::read_to_string(repo.store().path()).unwrap();
        assert!(written.contains("Patriciërs en patriotten"));
    }

    #[test]
    fn replace_all_is_all_or_nothing() {
        let (_tmp, repo) = setup();
        let before = std::fs::read(repo.store().path()).unwrap();

        let err = repo
            .replace_all(&json!({"chapters": [
                {"chapter": "Opstand en oorlog", "route": "opstand-en-oorlog", "image": "beeldenstorm.png"},
                {"chapter": "Nieuw", "route": "Not A Slug", "image": "missing.png"},
                {"chapter": "Patriciërs en patriotten", "route": "", "image": "nachtwacht.png"}
            ]}))
            .unwrap_err();

        let errors = err.field_errors().unwrap();
        assert_eq!(
            errors.get("chapters.1.route"),
            Some("String does not match expected pattern")
        );
        assert!(errors.contains("chapters.1.image"));
        assert_eq!(errors.get("chapters.2.route"), Some("Required"));
        assert!(!errors.contains("chapters.0.chapter"));
        assert_eq!(std::fs::read(repo.store().path()).unwrap(), before);
    }

    #[test]
    fn replace_all_rejects_duplicates() {
        let (_tmp, repo) = setup();
        let err = repo
            .replace_all(&json!({"chapters": [
                {"chapter": "A", "route": "a", "image": "nachtwacht.png"},
                {"chapter": "A", "route": "a", "image": "nachtwacht.png"}
            ]}))
            .unwrap_err();

        let errors = err.field_errors().unwrap();
        assert_eq!(errors.get("chapters.1.chapter"), Some("Duplicate chapter"));
        assert_eq!(errors.get("chapters.1.route"), Some("Duplicate route"));
    }

    #[test]
    fn replace_all_requires_chapters_array() {
        let (_tmp, repo) = setup();
        let err = repo.replace_all(&json!({})).unwrap_err();
        assert_eq!(err.field_errors().unwrap().get("chapters"), Some("Required"));

        let err = repo.replace_all(&json!({"chapters": 3})).unwrap_err();
        assert!(err.field_errors().unwrap().contains("chapters"));
    }
}
