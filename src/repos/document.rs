//! Store-level vocabulary shared by every `DocumentStore` backend.
//!
//! Responsibility:
//! - Record references, filters and the transition descriptors the executor sends to the store.
//! - The in-process application of a transition to a document (`Transition::apply`), used by the
//!   in-memory backend and to build the initial body of an upserted document.
//!
//! Documents are JSON objects with camelCase keys. `_id` always holds the record id and
//! timestamps are RFC 3339 UTC strings with millisecond precision, so comparing them as
//! strings compares them in time.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::services::record_id::RecordId;

pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

/// `(collection, field)` pairs that no two documents may share a value for.
///
/// Backends enforce these on insert and report `RepoError::Duplicate`.
pub const UNIQUE_FIELDS: &[(&str, &str)] = &[("users", "email")];
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Canonical string form for stored timestamps.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize a typed record into a store document.
pub fn encode<T: Serialize>(value: &T) -> Result<Document, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "documents must be JSON objects, got {other}"
        ))),
    }
}

pub fn decode<T: DeserializeOwned>(doc: Document) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(doc))
}

/// Validated pointer to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
    pub collection: &'static str,
    pub id: RecordId,
}

impl RecordRef {
    pub fn new(collection: &'static str, id: RecordId) -> Self {
        Self { collection, id }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(&'static str, Value),
    In(&'static str, Vec<Value>),
    /// Strings compare lexically, numbers numerically; anything else never matches.
    Lt(&'static str, Value),
    /// Array field contains the value.
    Contains(&'static str, Value),
}

impl Condition {
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Condition::Eq(field, value) => doc.get(*field) == Some(value),
            Condition::In(field, values) => doc
                .get(*field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
            Condition::Lt(field, bound) => match (doc.get(*field), bound) {
                (Some(Value::String(a)), Value::String(b)) => a < b,
                (Some(Value::Number(a)), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => a < b,
                    _ => false,
                },
                _ => false,
            },
            Condition::Contains(field, value) => match doc.get(*field) {
                Some(Value::Array(items)) => items.contains(value),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub collection: &'static str,
    pub id: Option<RecordId>,
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn collection(collection: &'static str) -> Self {
        Self {
            collection,
            id: None,
            conditions: Vec::new(),
        }
    }

    pub fn by_ref(reference: &RecordRef) -> Self {
        Self {
            collection: reference.collection,
            id: Some(reference.id.clone()),
            conditions: Vec::new(),
        }
    }

    pub fn eq(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field, value.into()));
        self
    }

    pub fn one_of<V: Into<Value>>(
        mut self,
        field: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push(Condition::In(field, values));
        self
    }

    pub fn lt(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Lt(field, value.into()));
        self
    }

    pub fn contains(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Contains(field, value.into()));
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(id) = &self.id
            && doc.get(ID_FIELD).and_then(Value::as_str) != Some(id.as_str())
        {
            return false;
        }
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Overwrite top-level fields.
    Set(Document),
    /// Append to an array field, keeping prior entries.
    Push { field: &'static str, value: Value },
    /// Append to an array field unless an equal entry is already there.
    AddToSet { field: &'static str, value: Value },
}

impl Transition {
    pub fn set(fields: impl Serialize) -> Result<Self, serde_json::Error> {
        encode(&fields).map(Self::Set)
    }

    /// Apply to `doc` in place. Returns whether anything changed.
    ///
    /// `updatedAt` is not touched here; callers stamp it only when this returns true.
    pub fn apply(&self, doc: &mut Document) -> bool {
        match self {
            Transition::Set(fields) => {
                let mut changed = false;
                for (key, value) in fields {
                    if doc.get(key) != Some(value) {
                        doc.insert(key.clone(), value.clone());
                        changed = true;
                    }
                }
                changed
            }
            Transition::Push { field, value } => {
                push_entry(doc, field, value.clone());
                true
            }
            Transition::AddToSet { field, value } => {
                let present = matches!(doc.get(*field), Some(Value::Array(items)) if items.contains(value));
                if present {
                    false
                } else {
                    push_entry(doc, field, value.clone());
                    true
                }
            }
        }
    }
}

fn push_entry(doc: &mut Document, field: &str, value: Value) {
    match doc.get_mut(field) {
        Some(Value::Array(items)) => items.push(value),
        _ => {
            doc.insert(field.to_string(), Value::Array(vec![value]));
        }
    }
}

/// One conditional update against a single record.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub transition: Transition,
    /// `Some` makes the update an upsert; the fields are written only when the record is created.
    pub on_insert: Option<Document>,
    pub at: DateTime<Utc>,
}

impl Update {
    pub fn new(transition: Transition, at: DateTime<Utc>) -> Self {
        Self {
            transition,
            on_insert: None,
            at,
        }
    }

    pub fn upsert(mut self, on_insert: Document) -> Self {
        self.on_insert = Some(on_insert);
        self
    }

    /// Body of the document created when an upsert finds nothing.
    pub fn initial_document(&self, id: &RecordId) -> Document {
        let mut doc = self.on_insert.clone().unwrap_or_default();
        self.transition.apply(&mut doc);
        let now = Value::String(timestamp(self.at));
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        doc.insert(CREATED_AT.to_string(), now.clone());
        doc.insert(UPDATED_AT.to_string(), now);
        doc
    }
}

/// Outcome of one `update_one`.
///
/// - `matched=false, upserted=false`: nothing addressed by the filter
/// - `matched=true, modified=false`: already in the target state
/// - `upserted=true`: the record did not exist and was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransitionResult {
    pub matched: bool,
    pub modified: bool,
    pub upserted: bool,
}

impl TransitionResult {
    pub const NOT_FOUND: Self = Self {
        matched: false,
        modified: false,
        upserted: false,
    };
    pub const UNCHANGED: Self = Self {
        matched: true,
        modified: false,
        upserted: false,
    };
    pub const CHANGED: Self = Self {
        matched: true,
        modified: true,
        upserted: false,
    };
    pub const CREATED: Self = Self {
        matched: false,
        modified: true,
        upserted: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: &'static str,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<Sort>,
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn newest_first(limit: i64) -> Self {
        Self {
            sort: Some(Sort {
                field: CREATED_AT,
                descending: true,
            }),
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulator {
    Count,
    Max(&'static str),
    Avg(&'static str),
}

/// Filter, optionally unwind an array field, then group.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub filter: Filter,
    pub unwind: Option<&'static str>,
    pub group_by: &'static str,
    pub accumulators: Vec<(&'static str, Accumulator)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub key: Value,
    pub values: Document,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn set_reports_no_change_when_values_already_match() {
        let mut d = doc(json!({"status": "published", "title": "Rust"}));
        let t = Transition::Set(doc(json!({"status": "published"})));
        assert!(!t.apply(&mut d));
        let t = Transition::Set(doc(json!({"status": "archived"})));
        assert!(t.apply(&mut d));
        assert_eq!(d["status"], "archived");
    }

    #[test]
    fn push_keeps_prior_entries() {
        let mut d = doc(json!({"attempts": [{"score": 10.0}]}));
        let t = Transition::Push {
            field: "attempts",
            value: json!({"score": 50.0}),
        };
        assert!(t.apply(&mut d));
        assert_eq!(d["attempts"], json!([{"score": 10.0}, {"score": 50.0}]));
    }

    #[test]
    fn add_to_set_is_idempotent() {
        let mut d = doc(json!({}));
        let t = Transition::AddToSet {
            field: "enrolledCourses",
            value: json!("507f1f77bcf86cd799439011"),
        };
        assert!(t.apply(&mut d));
        assert!(!t.apply(&mut d));
        assert_eq!(d["enrolledCourses"], json!(["507f1f77bcf86cd799439011"]));
    }

    #[test]
    fn lt_compares_timestamps_as_strings() {
        let d = doc(json!({"expiresAt": "2024-01-01T00:00:00.000Z"}));
        assert!(Condition::Lt("expiresAt", json!("2024-06-01T00:00:00.000Z")).matches(&d));
        assert!(!Condition::Lt("expiresAt", json!("2023-06-01T00:00:00.000Z")).matches(&d));
        assert!(!Condition::Lt("missing", json!("2030-01-01T00:00:00.000Z")).matches(&d));
    }

    #[test]
    fn filter_checks_id_and_conditions() {
        let id = RecordId::parse("507f1f77bcf86cd799439011").unwrap();
        let d = doc(json!({"_id": id.as_str(), "status": "draft"}));
        let reference = RecordRef::new("courses", id);
        assert!(Filter::by_ref(&reference).matches(&d));
        assert!(
            Filter::by_ref(&reference)
                .one_of("status", ["draft", "published"])
                .matches(&d)
        );
        assert!(!Filter::by_ref(&reference).eq("status", "archived").matches(&d));
    }

    #[test]
    fn initial_document_carries_insert_fields_and_timestamps() {
        let id = RecordId::parse("507f1f77bcf86cd799439011").unwrap();
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let update = Update::new(Transition::Set(doc(json!({"theme": "dark"}))), at)
            .upsert(doc(json!({"userId": id.as_str()})));
        let created = update.initial_document(&id);
        assert_eq!(created["theme"], "dark");
        assert_eq!(created["userId"], id.as_str());
        assert_eq!(created["_id"], id.as_str());
        assert_eq!(created["createdAt"], "2024-05-01T10:00:00.000Z");
        assert_eq!(created["updatedAt"], "2024-05-01T10:00:00.000Z");
    }
}
