// Payload documents and dotted field paths
//
// Request payloads are plain serde_json values. Every mutation works on a deep
// copy of the base document, so fixtures handed out once can be reused by any
// number of probes without leaking changes between them.
//
// Example:
//   base:   {"contactPerson": {"name": "A"}}
//   path:   "contactPerson.email"
//   value:  "bad@@"
//   result: {"contactPerson": {"name": "A", "email": "bad@@"}}

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

/// A JSON request or response body.
pub type Document = Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("field path is empty")]
    EmptyPath,

    #[error("field path '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("cannot descend into '{segment}' of '{path}': found {found}, expected object")]
    TypeMismatch {
        path: String,
        segment: String,
        found: &'static str,
    },
}

/// Dot-separated location inside a document, e.g. `contactPerson.email`.
///
/// Keys containing a literal `.` cannot be addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, MutationError> {
        if path.is_empty() {
            return Err(MutationError::EmptyPath);
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(MutationError::EmptySegment(path.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Split into parent segments and the final key.
    fn split_last(&self) -> (&[String], &str) {
        // parse() guarantees at least one segment
        match self.segments.split_last() {
            Some((last, parents)) => (parents, last.as_str()),
            None => (&[], ""),
        }
    }
}

impl FromStr for FieldPath {
    type Err = MutationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Name of a value's JSON type, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Return a copy of `base` with `path` set to `value`.
///
/// Missing intermediate objects are created. An intermediate that exists but
/// is not an object is a [`MutationError::TypeMismatch`]; nothing is
/// overwritten in that case.
pub fn mutate_field(base: &Document, path: &str, value: impl Into<Value>) -> Result<Document, MutationError> {
    let field_path = FieldPath::parse(path)?;
    let mut doc = base.clone();
    let (parents, last) = field_path.split_last();

    let mut cursor = as_object_mut(&mut doc, path, "")?;
    for segment in parents {
        let entry = cursor
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        cursor = as_object_mut(entry, path, segment)?;
    }
    cursor.insert(last.to_string(), value.into());
    Ok(doc)
}

/// Return a copy of `base` without the field at `path`.
///
/// Removing a field that is not there leaves the copy unchanged.
pub fn remove_field(base: &Document, path: &str) -> Result<Document, MutationError> {
    let field_path = FieldPath::parse(path)?;
    let mut doc = base.clone();
    let (parents, last) = field_path.split_last();

    if let Some(parent) = existing_parent_mut(&mut doc, parents, path)? {
        parent.remove(last);
    }
    Ok(doc)
}

fn existing_parent_mut<'a>(
    doc: &'a mut Value,
    parents: &[String],
    path: &str,
) -> Result<Option<&'a mut Map<String, Value>>, MutationError> {
    let mut cursor = as_object_mut(doc, path, "")?;
    for segment in parents {
        match cursor.get_mut(segment.as_str()) {
            Some(next) => cursor = as_object_mut(next, path, segment)?,
            None => return Ok(None),
        }
    }
    Ok(Some(cursor))
}

/// Read the value at `path`, if every segment resolves.
pub fn get_field<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let field_path = FieldPath::parse(path).ok()?;
    field_path
        .segments()
        .iter()
        .try_fold(doc, |current, segment| current.as_object()?.get(segment.as_str()))
}

fn as_object_mut<'a>(
    value: &'a mut Value,
    path: &str,
    segment: &str,
) -> Result<&'a mut Map<String, Value>, MutationError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(MutationError::TypeMismatch {
            path: path.to_string(),
            segment: segment.to_string(),
            found: value_kind(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overwrites_existing_nested_field() {
        let base = json!({"a": {"b": 1}});
        let mutated = mutate_field(&base, "a.b", 2).unwrap();
        assert_eq!(mutated, json!({"a": {"b": 2}}));
        assert_eq!(base, json!({"a": {"b": 1}}));
    }

    #[test]
    fn creates_missing_intermediates() {
        let mutated = mutate_field(&json!({}), "x.y.z", 5).unwrap();
        assert_eq!(mutated, json!({"x": {"y": {"z": 5}}}));
    }

    #[test]
    fn single_segment_sets_top_level() {
        let base = json!({"businessLocationId": "abc", "numberOfParcels": 3});
        let mutated = mutate_field(&base, "businessLocationId", "invalid_id").unwrap();
        assert_eq!(mutated["businessLocationId"], json!("invalid_id"));
        assert_eq!(mutated["numberOfParcels"], json!(3));
    }

    #[test]
    fn last_write_wins() {
        let base = json!({"contactPerson": {"email": "a@b.co"}});
        let once = mutate_field(&base, "contactPerson.email", "first").unwrap();
        let twice = mutate_field(&once, "contactPerson.email", json!({"nested": true})).unwrap();
        assert_eq!(get_field(&twice, "contactPerson.email"), Some(&json!({"nested": true})));
        assert_eq!(get_field(&once, "contactPerson.email"), Some(&json!("first")));
    }

    #[test]
    fn result_does_not_alias_base() {
        let base = json!({"contactPerson": {"name": "A", "tags": ["x"]}});
        let mut mutated = mutate_field(&base, "contactPerson.phone", "+20123456789").unwrap();
        mutated["contactPerson"]["tags"][0] = json!("changed");
        mutated["contactPerson"]["name"] = json!("changed");
        assert_eq!(base, json!({"contactPerson": {"name": "A", "tags": ["x"]}}));
    }

    #[test]
    fn non_object_intermediate_is_rejected() {
        let base = json!({"contactPerson": "flat string"});
        let err = mutate_field(&base, "contactPerson.name", "x").unwrap_err();
        assert_eq!(
            err,
            MutationError::TypeMismatch {
                path: "contactPerson.name".to_string(),
                segment: "contactPerson".to_string(),
                found: "string",
            }
        );
    }

    #[test]
    fn non_object_root_is_rejected() {
        let err = mutate_field(&json!([1, 2]), "a", 1).unwrap_err();
        assert!(matches!(err, MutationError::TypeMismatch { found: "array", .. }));
    }

    #[test]
    fn empty_paths_are_rejected() {
        assert_eq!(mutate_field(&json!({}), "", 1).unwrap_err(), MutationError::EmptyPath);
        assert_eq!(
            mutate_field(&json!({}), "a..b", 1).unwrap_err(),
            MutationError::EmptySegment("a..b".to_string())
        );
        assert!("a.".parse::<FieldPath>().is_err());
    }

    #[test]
    fn round_trip_through_get_field() {
        let values = vec![json!(null), json!(false), json!(-1), json!("x"), json!([1, {"a": 2}]), json!({"k": "v"})];
        for value in values {
            let mutated = mutate_field(&json!({"p": {"q": 0}}), "p.q", value.clone()).unwrap();
            assert_eq!(get_field(&mutated, "p.q"), Some(&value));
        }
    }

    #[test]
    fn get_field_misses() {
        let doc = json!({"a": {"b": "leaf"}});
        assert_eq!(get_field(&doc, "a.c"), None);
        assert_eq!(get_field(&doc, "a.b.c"), None);
        assert_eq!(get_field(&doc, ""), None);
    }

    #[test]
    fn remove_field_copies_and_removes() {
        let base = json!({"contactPerson": {"name": "A"}, "businessLocationId": "x"});
        let removed = remove_field(&base, "contactPerson").unwrap();
        assert_eq!(removed, json!({"businessLocationId": "x"}));
        assert!(base.get("contactPerson").is_some());

        let unchanged = remove_field(&base, "missing.deeper").unwrap();
        assert_eq!(unchanged, base);
    }

    #[test]
    fn field_path_display_round_trips() {
        let path = FieldPath::parse("bankInfo.paymentInfoOtp").unwrap();
        assert_eq!(path.segments().len(), 2);
        assert_eq!(path.to_string(), "bankInfo.paymentInfoOtp");
    }
}
