//! Question collection: CRUD, renumbering, adjacency meta and joins.
//!
//! Every persisted mutation renumbers the whole collection. Questions are
//! stable-sorted by `(chapter position, question_number)` and then numbered
//! `1..=N` in that order. The file is written in sorted order, so file order
//! and numbering agree after any write.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::case::{snake_keys, to_snake_case};
use crate::chapters::{ChapterRepository, JoinedChapter};
use crate::config::DataConfig;
use crate::error::{DataError, StoreError};
use crate::schema::{Coerced, Deserialized, Field, Schema, length, one_of, one_of_int, predicate, range};
use crate::store::{Record, RecordStore};

const ANSWER_CHOICES: &[i64] = &[0, 1, 2];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Display name of the owning chapter.
    pub chapter: String,
    pub question_number: u32,
    pub title: String,
    pub answers: Vec<String>,
    /// Index of the correct entry in `answers`.
    pub answer: u8,
    pub answered: Option<u8>,
    pub question_id: String,
    /// Read-time annotation; stripped before every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<QuestionMeta>,
}

impl Record for Question {
    const KIND: &'static str = "question";

    fn key(&self) -> &str {
        &self.question_id
    }
}

/// Neighbours in the listed order, by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMeta {
    pub prev_question_id: Option<String>,
    pub next_question_id: Option<String>,
    pub total_count: usize,
}

/// Public listing shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSummary {
    pub question_id: String,
    pub answer: u8,
    pub answered: Option<u8>,
}

/// Question with its chapter (and that chapter's image URL) joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedQuestion {
    pub chapter: JoinedChapter,
    pub question_number: u32,
    pub title: String,
    pub answers: Vec<String>,
    pub answer: u8,
    pub answered: Option<u8>,
    pub question_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<QuestionMeta>,
}

impl Question {
    pub fn summary(&self) -> AnswerSummary {
        AnswerSummary {
            question_id: self.question_id.clone(),
            answer: self.answer,
            answered: self.answered,
        }
    }

    /// Stringified value at a snake_case field path, as compared by filters.
    pub fn field_value(&self, path: &str) -> Option<String> {
        match path {
            "question_id" => Some(self.question_id.clone()),
            "chapter" => Some(self.chapter.clone()),
            "question_number" => Some(self.question_number.to_string()),
            "title" => Some(self.title.clone()),
            "answer" => Some(self.answer.to_string()),
            "answered" => self.answered.as_ref().map(ToString::to_string),
            _ => None,
        }
    }

    /// QuestionToChapter join against an already loaded chapter list.
    fn join(self, chapter: JoinedChapter) -> JoinedQuestion {
        JoinedQuestion {
            chapter,
            question_number: self.question_number,
            title: self.title,
            answers: self.answers,
            answer: self.answer,
            answered: self.answered,
            question_id: self.question_id,
            meta: self.meta,
        }
    }
}

impl JoinedQuestion {
    /// Like [`Question::field_value`], plus the nested `chapter.*` paths.
    /// A bare `chapter` compares against the chapter's display name.
    pub fn field_value(&self, path: &str) -> Option<String> {
        match path {
            "chapter" | "chapter.chapter" => Some(self.chapter.chapter.clone()),
            "chapter.route" => Some(self.chapter.route.clone()),
            "chapter.image.url" => Some(self.chapter.image.url.clone()),
            "question_id" => Some(self.question_id.clone()),
            "question_number" => Some(self.question_number.to_string()),
            "title" => Some(self.title.clone()),
            "answer" => Some(self.answer.to_string()),
            "answered" => self.answered.as_ref().map(ToString::to_string),
            _ => None,
        }
    }
}

/// Exact-match filters on stringified field values.
///
/// Keys are normalized to snake_case on insert, so `questionNumber` and
/// `question_number` are the same filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(Vec<(String, String)>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.push((to_snake_case(key), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when every filter equals the value `lookup` yields for its path.
    pub fn matches<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.iter()
            .all(|(key, expected)| lookup(key).as_deref() == Some(expected))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Self::new();
        for (key, value) in iter {
            filters.insert(key.as_ref(), value);
        }
        filters
    }
}

impl fmt::Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

fn chapter_position(chapter: &str, chapter_names: &[String]) -> usize {
    chapter_names
        .iter()
        .position(|name| name == chapter)
        .map_or(0, |index| index + 1)
}

/// Stable-sort by `(chapter position, question_number)` and number `1..=N`.
///
/// Questions whose chapter is unknown get position 0 and sort first.
pub fn renumber(questions: &mut [Question], chapter_names: &[String]) {
    questions.sort_by_key(|q| (chapter_position(&q.chapter, chapter_names), q.question_number));
    for (index, question) in questions.iter_mut().enumerate() {
        question.question_number = u32::try_from(index + 1).unwrap_or(u32::MAX);
    }
}

/// Attach prev/next ids and the total count, following slice order.
pub fn annotate(questions: &mut [Question]) {
    let ids: Vec<String> = questions.iter().map(|q| q.question_id.clone()).collect();
    let total_count = ids.len();
    for (index, question) in questions.iter_mut().enumerate() {
        question.meta = Some(QuestionMeta {
            prev_question_id: index.checked_sub(1).map(|i| ids[i].clone()),
            next_question_id: ids.get(index + 1).cloned(),
            total_count,
        });
    }
}

fn valid_answers(value: &Coerced) -> bool {
    matches!(value, Coerced::List(items)
        if items.len() == 3 && items.iter().all(|a| !a.trim().is_empty()))
}

/// Field table for add and update payloads.
pub fn question_schema(chapter_names: Vec<String>) -> Schema {
    Schema::new(vec![
        Field::string("chapter").check(one_of(chapter_names)),
        Field::integer("question_number")
            .optional()
            .check(range(Some(1), Some(i64::from(u32::MAX)))),
        Field::string("title").check(length(1, 100)),
        Field::list("answers").check(predicate(valid_answers, "Three answers required")),
        Field::integer("answer").check(one_of_int(ANSWER_CHOICES)),
        Field::integer("answered")
            .optional()
            .check(one_of_int(ANSWER_CHOICES)),
    ])
}

/// Validated payload fields, everything but the identity.
struct QuestionFields {
    chapter: String,
    question_number: Option<u32>,
    title: String,
    answers: Vec<String>,
    answer: u8,
    answered: Option<u8>,
}

impl QuestionFields {
    fn from_values(values: &Deserialized) -> Self {
        Self {
            chapter: values.string("chapter").unwrap_or_default(),
            question_number: values
                .integer("question_number")
                .and_then(|n| u32::try_from(n).ok()),
            title: values.string("title").unwrap_or_default(),
            answers: values.list("answers").unwrap_or_default(),
            answer: values
                .integer("answer")
                .and_then(|n| u8::try_from(n).ok())
                .unwrap_or_default(),
            answered: values.integer("answered").and_then(|n| u8::try_from(n).ok()),
        }
    }
}

pub struct QuestionRepository {
    store: RecordStore<Question>,
    chapters: ChapterRepository,
}

impl QuestionRepository {
    pub fn new(config: &DataConfig) -> Self {
        Self {
            store: RecordStore::new(config.questions_path()),
            chapters: ChapterRepository::new(config),
        }
    }

    pub fn store(&self) -> &RecordStore<Question> {
        &self.store
    }

    pub fn chapters(&self) -> &ChapterRepository {
        &self.chapters
    }

    /// Questions in file order, filtered, optionally annotated.
    ///
    /// Meta is computed over the full collection before filtering, so a
    /// filtered question still points at its neighbours in the file.
    pub fn list(&self, filters: &Filters, with_meta: bool) -> Result<Vec<Question>, StoreError> {
        let mut questions = self.store.load()?;
        if with_meta {
            annotate(&mut questions);
        }
        if !filters.is_empty() {
            questions.retain(|q| filters.matches(|path| q.field_value(path)));
        }
        Ok(questions)
    }

    pub fn answers(&self) -> Result<Vec<AnswerSummary>, StoreError> {
        Ok(self.store.load()?.iter().map(Question::summary).collect())
    }

    pub fn get(&self, question_id: &str) -> Result<Question, DataError> {
        self.store
            .load()?
            .into_iter()
            .find(|q| q.question_id == question_id)
            .ok_or_else(|| DataError::QuestionNotFound {
                lookup: question_id.to_string(),
            })
    }

    /// First question in file order matching every filter.
    pub fn find_first(&self, filters: &Filters) -> Result<Question, DataError> {
        self.list(filters, false)?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::QuestionNotFound {
                lookup: filters.to_string(),
            })
    }

    /// Public search over the joined form, with meta.
    ///
    /// Every question is joined before filtering, so a question whose
    /// chapter no longer exists fails the whole search with ChapterNotFound.
    pub fn find(&self, filters: &Filters) -> Result<JoinedQuestion, DataError> {
        if filters.is_empty() {
            return Err(DataError::MissingFilters);
        }
        let chapters = self.chapters.list()?;
        let images_url = self.chapters.images_url();
        let mut found = None;
        for question in self.list(&Filters::new(), true)? {
            let chapter = chapters
                .iter()
                .find(|c| c.chapter == question.chapter)
                .ok_or_else(|| DataError::ChapterNotFound {
                    chapter: question.chapter.clone(),
                })?;
            let joined = question.join(chapter.join_image(images_url));
            if found.is_none() && filters.matches(|path| joined.field_value(path)) {
                found = Some(joined);
            }
        }
        found.ok_or_else(|| DataError::QuestionNotFound {
            lookup: filters.to_string(),
        })
    }

    /// QuestionToChapter join, with the chapter image resolved to a URL.
    pub fn join_chapter(&self, question: Question) -> Result<JoinedQuestion, DataError> {
        let chapter = self.chapters.get(&question.chapter)?;
        let joined = self.chapters.join_image(&chapter);
        Ok(question.join(joined))
    }

    /// Validate `payload` and append a new question.
    ///
    /// Payload keys may be camelCase or snake_case.
    /// Without a `question_number` the question goes after every existing
    /// question of its chapter. Returns the question as persisted, with its
    /// final number.
    pub fn add(&self, payload: &Value) -> Result<Question, DataError> {
        let fields = self.validate(payload)?;
        let mut questions = self.store.load()?;
        let question = Question {
            question_number: fields
                .question_number
                .unwrap_or_else(|| u32::try_from(questions.len() + 1).unwrap_or(u32::MAX)),
            chapter: fields.chapter,
            title: fields.title,
            answers: fields.answers,
            answer: fields.answer,
            answered: fields.answered,
            question_id: Uuid::new_v4().to_string(),
            meta: None,
        };
        let question_id = question.question_id.clone();
        questions.push(question);

        let questions = self.persist(questions, "added", &question_id)?;
        persisted(questions, &question_id)
    }

    /// Replace every field except `question_id`.
    ///
    /// An absent `question_number` keeps the current number.
    pub fn update(&self, question_id: &str, payload: &Value) -> Result<Question, DataError> {
        let mut questions = self.store.load()?;
        let Some(index) = questions.iter().position(|q| q.question_id == question_id) else {
            return Err(DataError::QuestionNotFound {
                lookup: question_id.to_string(),
            });
        };
        let fields = self.validate(payload)?;

        let existing = &mut questions[index];
        existing.question_number = fields.question_number.unwrap_or(existing.question_number);
        existing.chapter = fields.chapter;
        existing.title = fields.title;
        existing.answers = fields.answers;
        existing.answer = fields.answer;
        existing.answered = fields.answered;

        let questions = self.persist(questions, "updated", question_id)?;
        persisted(questions, question_id)
    }

    /// Remove a question; the rest are renumbered.
    pub fn delete(&self, question_id: &str) -> Result<(), DataError> {
        let mut questions = self.store.load()?;
        let before = questions.len();
        questions.retain(|q| q.question_id != question_id);
        if questions.len() == before {
            return Err(DataError::QuestionNotFound {
                lookup: question_id.to_string(),
            });
        }
        self.persist(questions, "deleted", question_id)?;
        Ok(())
    }

    fn validate(&self, payload: &Value) -> Result<QuestionFields, DataError> {
        let schema = question_schema(self.chapters.chapter_names()?);
        match schema.deserialize(&snake_keys(payload.clone())) {
            Ok(values) => Ok(QuestionFields::from_values(&values)),
            Err(errors) => {
                tracing::warn!(errors = errors.len(), "rejected question payload");
                Err(errors.into())
            }
        }
    }

    fn persist(
        &self,
        mut questions: Vec<Question>,
        action: &str,
        question_id: &str,
    ) -> Result<Vec<Question>, StoreError> {
        let chapter_names = self.chapters.chapter_names()?;
        for question in &mut questions {
            question.meta = None;
        }
        renumber(&mut questions, &chapter_names);
        self.store.save(&questions)?;
        tracing::info!(
            question_id,
            count = questions.len(),
            "{action} question"
        );
        Ok(questions)
    }
}

fn persisted(questions: Vec<Question>, question_id: &str) -> Result<Question, DataError> {
    questions
        .into_iter()
        .find(|q| q.question_id == question_id)
        .ok_or_else(|| DataError::QuestionNotFound {
            lookup: question_id.to_string(),
        })
}
