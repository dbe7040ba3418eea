#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Collection-level invariants exercised through the public repository API.

use pretty_assertions::assert_eq;
use quizbank_core::{
    DataConfig, DataError, Filters, ImageLibrary, NewImage, Question, QuestionRepository,
    RecordStore,
};
use serde_json::{Value, json};
use tempfile::TempDir;

const CHAPTERS: &str = r#"[
  {
    "chapter": "Opstand en oorlog",
    "route": "opstand-en-oorlog",
    "image": "beeldenstorm.png"
  },
  {
    "chapter": "De Gouden Eeuw",
    "route": "de-gouden-eeuw",
    "image": "nachtwacht.png"
  }
]"#;

const QUESTIONS: &str = r#"[
  {
    "chapter": "Opstand en oorlog",
    "questionNumber": 1,
    "title": "Wie was Willem van Oranje?",
    "answers": [
      "Een prins",
      "Een koopman",
      "Een schilder"
    ],
    "answer": 0,
    "answered": null,
    "questionId": "c1401fa4-23e3-4e73-aa1b-a4ac29b8db51"
  },
  {
    "chapter": "De Gouden Eeuw",
    "questionNumber": 2,
    "title": "Wie schilderde De Nachtwacht?",
    "answers": [
      "Vermeer",
      "Rembrandt",
      "Hals"
    ],
    "answer": 1,
    "answered": 1,
    "questionId": "70582011-083a-4de6-aa1d-c325a884084f"
  }
]"#;

struct Fixture {
    _tmp: TempDir,
    config: DataConfig,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let config = DataConfig::rooted_at(tmp.path());
        std::fs::create_dir_all(&config.data_dir).unwrap();
        std::fs::create_dir_all(&config.images_dir).unwrap();
        std::fs::write(config.chapters_path(), CHAPTERS).unwrap();
        std::fs::write(config.questions_path(), QUESTIONS).unwrap();
        for image in ["beeldenstorm.png", "nachtwacht.png"] {
            std::fs::write(config.images_dir.join(image), b"\x89PNG").unwrap();
        }
        Self { _tmp: tmp, config }
    }

    fn questions(&self) -> QuestionRepository {
        QuestionRepository::new(&self.config)
    }
}

fn payload(chapter: &str, title: &str) -> Value {
    json!({
        "chapter": chapter,
        "title": title,
        "answers": ["Ja", "Nee", "Misschien"],
        "answer": 0
    })
}

fn assert_dense(questions: &[Question]) {
    let numbers: Vec<u32> = questions.iter().map(|q| q.question_number).collect();
    let expected: Vec<u32> = (1..=questions.len() as u32).collect();
    assert_eq!(numbers, expected);
}

#[test]
fn sequential_adds_keep_numbers_dense() {
    let fixture = Fixture::new();
    let repo = fixture.questions();
    let chapters = ["De Gouden Eeuw", "Opstand en oorlog"];

    for i in 0..6 {
        repo.add(&payload(chapters[i % 2], &format!("Vraag {i}")))
            .unwrap();
        let all = repo.list(&Filters::new(), false).unwrap();
        assert_eq!(all.len(), 3 + i);
        assert_dense(&all);
    }

    let all = repo.list(&Filters::new(), false).unwrap();
    let first_gouden = all
        .iter()
        .position(|q| q.chapter == "De Gouden Eeuw")
        .unwrap();
    assert!(
        all[first_gouden..]
            .iter()
            .all(|q| q.chapter == "De Gouden Eeuw"),
        "questions are grouped by chapter position"
    );
}

#[test]
fn delete_removes_exactly_one_and_renumbers() {
    let fixture = Fixture::new();
    let repo = fixture.questions();
    let added = repo.add(&payload("Opstand en oorlog", "Extra")).unwrap();

    repo.delete("c1401fa4-23e3-4e73-aa1b-a4ac29b8db51").unwrap();

    let all = repo.list(&Filters::new(), false).unwrap();
    let ids: Vec<&str> = all.iter().map(|q| q.question_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            added.question_id.as_str(),
            "70582011-083a-4de6-aa1d-c325a884084f"
        ]
    );
    assert_dense(&all);
}

#[test]
fn delete_of_unknown_id_leaves_file_byte_for_byte() {
    let fixture = Fixture::new();
    let repo = fixture.questions();

    let err = repo.delete("00000000-0000-0000-0000-000000000000").unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(
        std::fs::read_to_string(fixture.config.questions_path()).unwrap(),
        QUESTIONS
    );
}

#[test]
fn save_of_load_reproduces_fixture_files() {
    let fixture = Fixture::new();

    let questions = RecordStore::<Question>::new(fixture.config.questions_path());
    questions.save(&questions.load().unwrap()).unwrap();
    assert_eq!(
        std::fs::read_to_string(fixture.config.questions_path()).unwrap(),
        QUESTIONS
    );

    let chapters = fixture.questions();
    let store = chapters.chapters().store();
    store.save(&store.load().unwrap()).unwrap();
    assert_eq!(
        std::fs::read_to_string(fixture.config.chapters_path()).unwrap(),
        CHAPTERS
    );
}

#[test]
fn answers_validation() {
    let fixture = Fixture::new();
    let repo = fixture.questions();

    let cases = [
        json!(["Ja", "Nee"]),
        json!(["Ja", "Nee", "Misschien", "Nooit"]),
        json!(["Ja", "   ", "Nee"]),
        json!(["", "Nee", "Misschien"]),
    ];
    for answers in cases {
        let mut body = payload("Opstand en oorlog", "Vraag");
        body["answers"] = answers.clone();
        let err = repo.add(&body).unwrap_err();
        let errors = err.field_errors().expect("validation error");
        assert_eq!(
            errors.get("answers"),
            Some("Three answers required"),
            "answers {answers}"
        );
    }

    for answer in [0, 1, 2] {
        let mut body = payload("Opstand en oorlog", "Vraag");
        body["answer"] = json!(answer);
        repo.add(&body).unwrap();
    }
}

#[test]
fn meta_links_every_question_to_its_neighbours() {
    let fixture = Fixture::new();
    let repo = fixture.questions();
    repo.add(&payload("De Gouden Eeuw", "Derde")).unwrap();

    let all = repo.list(&Filters::new(), true).unwrap();
    let n = all.len();
    for (i, question) in all.iter().enumerate() {
        let meta = question.meta.as_ref().unwrap();
        assert_eq!(meta.total_count, n);
        let prev = i.checked_sub(1).map(|p| all[p].question_id.clone());
        let next = all.get(i + 1).map(|q| q.question_id.clone());
        assert_eq!(meta.prev_question_id, prev);
        assert_eq!(meta.next_question_id, next);
    }
    assert_eq!(all[0].meta.as_ref().unwrap().prev_question_id, None);
    assert_eq!(all[n - 1].meta.as_ref().unwrap().next_question_id, None);
}

#[test]
fn image_reconcile_keeps_adds_and_rejects_jpg() {
    let tmp = TempDir::new().unwrap();
    for name in ["a.png", "b.png"] {
        std::fs::write(tmp.path().join(name), b"png").unwrap();
    }
    let library = ImageLibrary::new(tmp.path());

    let err = library
        .reconcile(&[], &[NewImage::new("photo.jpg", vec![1, 2, 3])])
        .unwrap_err();
    assert_eq!(
        err.field_errors().unwrap().get("non_field_error"),
        Some("Extension not allowed")
    );
    let mut names = library.list().unwrap();
    names.sort();
    assert_eq!(names, vec!["a.png", "b.png"]);

    library
        .reconcile(&["a.png".to_string()], &[NewImage::new("c.png", vec![7])])
        .unwrap();
    let mut names = library.list().unwrap();
    names.sort();
    assert_eq!(names, vec!["a.png", "c.png"]);
}

#[test]
fn posted_question_is_numbered_by_chapter_position() {
    let fixture = Fixture::new();
    let repo = fixture.questions();

    let added = repo
        .add(&json!({
            "chapter": "Opstand en oorlog",
            "title": "Wat is de Beeldenstorm?",
            "answers": ["Een opstand", "Een storm", "Een schilderij"],
            "answer": 0
        }))
        .unwrap();

    assert_eq!(added.question_number, 2);
    let all = repo.list(&Filters::new(), false).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].chapter, "De Gouden Eeuw");
    assert_eq!(all[2].question_number, 3);
}

#[test]
fn find_with_unknown_chapter_reference_is_not_found() {
    let fixture = Fixture::new();
    let repo = fixture.questions();
    repo.chapters()
        .replace_all(&json!({"chapters": [
            {"chapter": "De Gouden Eeuw", "route": "de-gouden-eeuw", "image": "nachtwacht.png"}
        ]}))
        .unwrap();

    let filters: Filters = [("questionNumber", "2")].into_iter().collect();
    let err = repo.find(&filters).unwrap_err();
    assert!(matches!(err, DataError::ChapterNotFound { .. }));
}
