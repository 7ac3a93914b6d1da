//! Document filters.

use serde_json::Value;

use crate::{Document, TYPE_FIELD};

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    /// Field is present and equal to the value.
    Eq(String, Value),
    /// Field is absent or equal to none of the values.
    NotIn(String, Vec<Value>),
    /// Field key is (or is not) present, regardless of value.
    Exists(String, bool),
}

impl Condition {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Eq(field, value) => doc.get(field) == Some(value),
            Self::NotIn(field, values) => doc.get(field).is_none_or(|v| !values.contains(v)),
            Self::Exists(field, present) => doc.contains(field) == *present,
        }
    }
}

/// A conjunction of field conditions.
///
/// The empty filter matches every document.
///
/// ```ignore
/// let unmigrated = Filter::of_type(ARTICLE_TYPE).exists(USER_ID_FIELD, true);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on the document `type` field.
    pub fn of_type(doc_type: &str) -> Self {
        Self::new().eq(TYPE_FIELD, doc_type)
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    pub fn not_in<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::NotIn(
            field.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn exists(mut self, field: impl Into<String>, present: bool) -> Self {
        self.conditions.push(Condition::Exists(field.into(), present));
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }

    /// The document type this filter is pinned to, if any.
    ///
    /// Backends use this to narrow a scan before applying the full filter.
    pub fn type_constraint(&self) -> Option<&str> {
        self.conditions.iter().find_map(|c| match c {
            Condition::Eq(field, Value::String(t)) if field == TYPE_FIELD => Some(t.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().matches(&doc(json!({}))));
    }

    #[test]
    fn test_eq_requires_presence() {
        let filter = Filter::new().eq("userId", "u1");
        assert!(filter.matches(&doc(json!({"userId": "u1"}))));
        assert!(!filter.matches(&doc(json!({"userId": "u2"}))));
        assert!(!filter.matches(&doc(json!({}))));
    }

    #[test]
    fn test_not_in_matches_missing_field() {
        let filter = Filter::new().not_in("_id", ["u1", "u2"]);
        assert!(!filter.matches(&doc(json!({"_id": "u1"}))));
        assert!(filter.matches(&doc(json!({"_id": "u3"}))));
        assert!(filter.matches(&doc(json!({}))));
    }

    #[test]
    fn test_not_in_empty_list_matches_everything() {
        let filter = Filter::new().not_in("_id", Vec::<String>::new());
        assert!(filter.matches(&doc(json!({"_id": "u1"}))));
    }

    #[test]
    fn test_exists_checks_key_not_value() {
        let filter = Filter::new().exists("userId", true);
        assert!(filter.matches(&doc(json!({"userId": null}))));
        assert!(!filter.matches(&doc(json!({"userProfileId": "p1"}))));

        let absent = Filter::new().exists("userId", false);
        assert!(absent.matches(&doc(json!({"userProfileId": "p1"}))));
    }

    #[test]
    fn test_conditions_are_conjunctive() {
        let filter = Filter::of_type("apostrophe-blog").exists("userId", true);
        assert!(filter.matches(&doc(json!({"type": "apostrophe-blog", "userId": "u1"}))));
        assert!(!filter.matches(&doc(json!({"type": "profile", "userId": "u1"}))));
    }

    #[test]
    fn test_type_constraint() {
        assert_eq!(
            Filter::of_type("profile").eq("userId", "u1").type_constraint(),
            Some("profile")
        );
        assert_eq!(Filter::new().eq("userId", "u1").type_constraint(), None);
    }
}
