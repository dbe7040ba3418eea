//! camelCase → snake_case key conversion.
//!
//! Files and API responses use camelCase; validation and filtering work on
//! snake_case. Record structs handle their own fields through serde; these
//! helpers cover the untyped inputs (payload maps and query filters).

use serde_json::{Map, Value};

/// `questionNumber` → `question_number`. Dotted paths convert per segment.
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev: Option<char> = None;
    for c in key.chars() {
        if c.is_uppercase() {
            if matches!(prev, Some(p) if p != '_' && p != '.') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Recursively rewrite every object key in `value` to snake_case.
pub fn snake_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(snake_map(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(snake_keys).collect()),
        other => other,
    }
}

fn snake_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (to_snake_case(&key), snake_keys(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("questionNumber"), "question_number");
        assert_eq!(to_snake_case("question_number"), "question_number");
        assert_eq!(to_snake_case("chapter.route"), "chapter.route");
        assert_eq!(to_snake_case("chapter.imageUrl"), "chapter.image_url");
        assert_eq!(to_snake_case("answer"), "answer");
    }

    #[test]
    fn snake_keys_recurses_into_arrays() {
        let input = serde_json::json!({
            "questionNumber": 2,
            "chapters": [{"chapterName": "Opstand en oorlog"}],
            "answers": ["Ja", "Nee", "Misschien"],
        });
        let expected = serde_json::json!({
            "question_number": 2,
            "chapters": [{"chapter_name": "Opstand en oorlog"}],
            "answers": ["Ja", "Nee", "Misschien"],
        });
        assert_eq!(snake_keys(input), expected);
    }
}
