//! Declarative payload validation.
//!
//! A [`Schema`] is an ordered table of [`Field`] descriptors. One routine,
//! [`Schema::deserialize`], walks every descriptor against a raw JSON object:
//! it coerces the value to the field's kind, applies the default for absent
//! optional fields, and runs the field's checks. Every field is visited even
//! after an earlier one fails, so the caller gets the full error map in one
//! pass.
//!
//! Checks that depend on other entities (known chapter names, available image
//! files) are built from a snapshot the caller reads from the owning
//! repository before validating.

use std::collections::BTreeMap;

use regex_lite::Regex;
use serde_json::Value;

use crate::error::FieldErrors;

const REQUIRED: &str = "Required";

/// Target type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    List,
}

/// A coerced field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coerced {
    Str(String),
    Int(i64),
    List(Vec<String>),
}

/// Validator predicate: `Err` carries the human-readable message.
pub type Check = Box<dyn Fn(&Coerced) -> Result<(), String> + Send + Sync>;

/// One entry of a schema table.
pub struct Field {
    name: &'static str,
    kind: FieldKind,
    required: bool,
    default: Option<Coerced>,
    checks: Vec<Check>,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            checks: Vec::new(),
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn list(name: &'static str) -> Self {
        Self::new(name, FieldKind::List)
    }

    /// Absent values are skipped instead of reported as `Required`.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Value used when the field is absent. Implies optional.
    pub fn default_value(mut self, value: Coerced) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Coerced) -> Result<(), String> + Send + Sync + 'static,
    {
        self.checks.push(Box::new(check));
        self
    }

    fn validate(&self, raw: Option<&Value>) -> Result<Option<Coerced>, String> {
        let coerced = match raw.map(|value| coerce(self.kind, value)).transpose()? {
            Some(Some(value)) => value,
            _ if self.required => return Err(REQUIRED.to_string()),
            _ => return Ok(self.default.clone()),
        };
        for check in &self.checks {
            check(&coerced)?;
        }
        Ok(Some(coerced))
    }
}

/// Ordered field table evaluated by [`Schema::deserialize`].
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Coerce and validate `raw`, collecting every field error.
    pub fn deserialize(&self, raw: &Value) -> Result<Deserialized, FieldErrors> {
        let Some(object) = raw.as_object() else {
            return Err(FieldErrors::non_field("Expected a JSON object"));
        };

        let mut values = BTreeMap::new();
        let mut errors = FieldErrors::new();
        for field in &self.fields {
            match field.validate(object.get(field.name)) {
                Ok(Some(value)) => {
                    values.insert(field.name, value);
                }
                Ok(None) => {}
                Err(message) => errors.insert(field.name, message),
            }
        }

        if errors.is_empty() {
            Ok(Deserialized { values })
        } else {
            Err(errors)
        }
    }
}

/// Typed values produced by a successful [`Schema::deserialize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deserialized {
    values: BTreeMap<&'static str, Coerced>,
}

impl Deserialized {
    pub fn string(&self, name: &str) -> Option<String> {
        match self.values.get(name) {
            Some(Coerced::Str(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(Coerced::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        match self.values.get(name) {
            Some(Coerced::List(value)) => Some(value.clone()),
            _ => None,
        }
    }
}

/// `Ok(None)` means the value counts as absent (`null` or an empty string).
fn coerce(kind: FieldKind, value: &Value) -> Result<Option<Coerced>, String> {
    match (kind, value) {
        (_, Value::Null) => Ok(None),
        (_, Value::String(s)) if s.is_empty() => Ok(None),

        (FieldKind::String, Value::String(s)) => Ok(Some(Coerced::Str(s.clone()))),
        (FieldKind::String, Value::Number(n)) => Ok(Some(Coerced::Str(n.to_string()))),
        (FieldKind::String, Value::Bool(b)) => Ok(Some(Coerced::Str(b.to_string()))),
        (FieldKind::String, other) => Err(format!("{other} is not a string")),

        (FieldKind::Integer, Value::Number(n)) => n
            .as_i64()
            .map(|n| Some(Coerced::Int(n)))
            .ok_or_else(|| format!("\"{n}\" is not a number")),
        (FieldKind::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|n| Some(Coerced::Int(n)))
            .map_err(|_| format!("\"{s}\" is not a number")),
        (FieldKind::Integer, other) => Err(format!("\"{other}\" is not a number")),

        (FieldKind::List, Value::Array(items)) => Ok(Some(Coerced::List(
            items.iter().map(item_to_string).collect(),
        ))),
        (FieldKind::List, Value::String(s)) => Ok(Some(Coerced::List(
            s.lines().map(str::to_string).collect(),
        ))),
        (FieldKind::List, other) => Err(format!("\"{other}\" is not iterable")),
    }
}

fn item_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Checks ───────────────────────────────────────────────────────────────

/// String must be one of `allowed`.
pub fn one_of(allowed: Vec<String>) -> impl Fn(&Coerced) -> Result<(), String> + Send + Sync {
    move |value| match value {
        Coerced::Str(s) if allowed.iter().any(|a| a == s) => Ok(()),
        Coerced::Str(s) => Err(format!("\"{s}\" is not one of {}", allowed.join(", "))),
        _ => Err("Invalid value".to_string()),
    }
}

/// Integer must be one of `allowed`.
pub fn one_of_int(allowed: &'static [i64]) -> impl Fn(&Coerced) -> Result<(), String> + Send + Sync {
    move |value| match value {
        Coerced::Int(n) if allowed.contains(n) => Ok(()),
        Coerced::Int(n) => {
            let choices: Vec<String> = allowed.iter().map(i64::to_string).collect();
            Err(format!("\"{n}\" is not one of {}", choices.join(", ")))
        }
        _ => Err("Invalid value".to_string()),
    }
}

/// Integer within `min..=max`; either bound may be open.
pub fn range(
    min: Option<i64>,
    max: Option<i64>,
) -> impl Fn(&Coerced) -> Result<(), String> + Send + Sync {
    move |value| match value {
        Coerced::Int(n) if min.is_some_and(|m| *n < m) => Err(format!(
            "{n} is less than minimum value {}",
            min.unwrap_or_default()
        )),
        Coerced::Int(n) if max.is_some_and(|m| *n > m) => Err(format!(
            "{n} is greater than maximum value {}",
            max.unwrap_or_default()
        )),
        Coerced::Int(_) => Ok(()),
        _ => Err("Invalid value".to_string()),
    }
}

/// String length in characters within `min..=max`.
pub fn length(min: usize, max: usize) -> impl Fn(&Coerced) -> Result<(), String> + Send + Sync {
    move |value| match value {
        Coerced::Str(s) => {
            let len = s.chars().count();
            if len < min {
                Err(format!("Shorter than minimum length {min}"))
            } else if len > max {
                Err(format!("Longer than maximum length {max}"))
            } else {
                Ok(())
            }
        }
        _ => Err("Invalid value".to_string()),
    }
}

/// String must match `pattern`.
pub fn pattern(pattern: &'static Regex) -> impl Fn(&Coerced) -> Result<(), String> + Send + Sync {
    move |value| match value {
        Coerced::Str(s) if pattern.is_match(s) => Ok(()),
        _ => Err("String does not match expected pattern".to_string()),
    }
}

/// Arbitrary predicate with a fixed message.
pub fn predicate<F>(
    test: F,
    message: &'static str,
) -> impl Fn(&Coerced) -> Result<(), String> + Send + Sync
where
    F: Fn(&Coerced) -> bool + Send + Sync,
{
    move |value| {
        if test(value) {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }
}
