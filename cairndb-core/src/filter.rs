//! Filter expressions over record metadata and document text.
//!
//! Filters narrow `get` and `query` to records whose metadata (or document)
//! satisfy a condition, e.g. "policy_type = 'flights' AND max_spend <= 300".

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metadata::{Metadata, MetadataValue};
use crate::record::Record;

/// A filter expression that can be evaluated against a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub(crate) condition: FilterCondition,
}

impl Filter {
    /// Creates a filter for a metadata field.
    ///
    /// # Example
    ///
    /// ```
    /// use cairndb_core::Filter;
    ///
    /// let filter = Filter::field("policy_type").eq("flights");
    /// ```
    pub fn field(name: &str) -> FieldFilter {
        FieldFilter {
            field_name: name.to_string(),
        }
    }

    /// Matches records whose document contains `substring`.
    pub fn document_contains(substring: &str) -> Filter {
        Filter::from_condition(FilterCondition::DocumentContains(substring.to_string()))
    }

    /// Creates a filter from a condition.
    pub fn from_condition(condition: FilterCondition) -> Self {
        Self { condition }
    }

    /// Combines this filter with another using AND.
    pub fn and(self, other: Filter) -> Self {
        Self {
            condition: FilterCondition::And(Box::new(self.condition), Box::new(other.condition)),
        }
    }

    /// Combines this filter with another using OR.
    pub fn or(self, other: Filter) -> Self {
        Self {
            condition: FilterCondition::Or(Box::new(self.condition), Box::new(other.condition)),
        }
    }

    /// Negates this filter.
    #[allow(clippy::should_implement_trait)]
    pub fn negate(self) -> Self {
        Self {
            condition: FilterCondition::Not(Box::new(self.condition)),
        }
    }

    /// Evaluates the filter against a record.
    pub fn matches(&self, record: &Record) -> bool {
        self.condition
            .matches(&record.metadata, record.document.as_deref())
    }

    /// Evaluates the filter against bare metadata (document conditions fail).
    pub fn matches_metadata(&self, metadata: &Metadata) -> bool {
        self.condition.matches(metadata, None)
    }

    /// Rejects expressions that can never be evaluated meaningfully.
    pub fn validate(&self) -> Result<()> {
        self.condition.validate()
    }
}

/// Builder for field-specific filter conditions.
#[derive(Debug)]
pub struct FieldFilter {
    field_name: String,
}

impl FieldFilter {
    pub fn eq<V: Into<MetadataValue>>(self, value: V) -> Filter {
        Filter::from_condition(FilterCondition::Eq(self.field_name, value.into()))
    }

    pub fn ne<V: Into<MetadataValue>>(self, value: V) -> Filter {
        Filter::from_condition(FilterCondition::Ne(self.field_name, value.into()))
    }

    pub fn gt<V: Into<MetadataValue>>(self, value: V) -> Filter {
        Filter::from_condition(FilterCondition::Gt(self.field_name, value.into()))
    }

    pub fn gte<V: Into<MetadataValue>>(self, value: V) -> Filter {
        Filter::from_condition(FilterCondition::Gte(self.field_name, value.into()))
    }

    pub fn lt<V: Into<MetadataValue>>(self, value: V) -> Filter {
        Filter::from_condition(FilterCondition::Lt(self.field_name, value.into()))
    }

    pub fn lte<V: Into<MetadataValue>>(self, value: V) -> Filter {
        Filter::from_condition(FilterCondition::Lte(self.field_name, value.into()))
    }

    /// Field value is in the given list.
    pub fn contained_in<V: Into<MetadataValue>>(self, values: Vec<V>) -> Filter {
        let values = values.into_iter().map(Into::into).collect();
        Filter::from_condition(FilterCondition::In(self.field_name, values))
    }

    /// Field value is not in the given list (or the field is missing).
    pub fn not_in<V: Into<MetadataValue>>(self, values: Vec<V>) -> Filter {
        let values = values.into_iter().map(Into::into).collect();
        Filter::from_condition(FilterCondition::NotIn(self.field_name, values))
    }

    /// String field contains the given substring.
    pub fn contains(self, substring: &str) -> Filter {
        Filter::from_condition(FilterCondition::Contains(
            self.field_name,
            substring.to_string(),
        ))
    }

    pub fn exists(self) -> Filter {
        Filter::from_condition(FilterCondition::Exists(self.field_name))
    }
}

/// The filter condition variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterCondition {
    Eq(String, MetadataValue),
    Ne(String, MetadataValue),
    Gt(String, MetadataValue),
    Gte(String, MetadataValue),
    Lt(String, MetadataValue),
    Lte(String, MetadataValue),
    In(String, Vec<MetadataValue>),
    NotIn(String, Vec<MetadataValue>),
    /// String field contains substring
    Contains(String, String),
    Exists(String),
    /// Record document contains substring
    DocumentContains(String),
    And(Box<FilterCondition>, Box<FilterCondition>),
    Or(Box<FilterCondition>, Box<FilterCondition>),
    Not(Box<FilterCondition>),
}

impl FilterCondition {
    /// Evaluates this condition against metadata and an optional document.
    pub fn matches(&self, metadata: &Metadata, document: Option<&str>) -> bool {
        match self {
            FilterCondition::Eq(field, value) => metadata
                .get(field)
                .map(|v| values_equal(v, value))
                .unwrap_or(false),
            FilterCondition::Ne(field, value) => metadata
                .get(field)
                .map(|v| !values_equal(v, value))
                .unwrap_or(true),
            FilterCondition::Gt(field, value) => {
                compare_values(metadata.get(field), value, |a, b| a > b)
            }
            FilterCondition::Gte(field, value) => {
                compare_values(metadata.get(field), value, |a, b| a >= b)
            }
            FilterCondition::Lt(field, value) => {
                compare_values(metadata.get(field), value, |a, b| a < b)
            }
            FilterCondition::Lte(field, value) => {
                compare_values(metadata.get(field), value, |a, b| a <= b)
            }
            FilterCondition::In(field, values) => metadata
                .get(field)
                .map(|v| values.iter().any(|t| values_equal(v, t)))
                .unwrap_or(false),
            FilterCondition::NotIn(field, values) => metadata
                .get(field)
                .map(|v| !values.iter().any(|t| values_equal(v, t)))
                .unwrap_or(true),
            FilterCondition::Contains(field, substring) => metadata
                .get_str(field)
                .map(|s| s.contains(substring.as_str()))
                .unwrap_or(false),
            FilterCondition::Exists(field) => metadata.contains_key(field),
            FilterCondition::DocumentContains(substring) => document
                .map(|d| d.contains(substring.as_str()))
                .unwrap_or(false),
            FilterCondition::And(a, b) => {
                a.matches(metadata, document) && b.matches(metadata, document)
            }
            FilterCondition::Or(a, b) => {
                a.matches(metadata, document) || b.matches(metadata, document)
            }
            FilterCondition::Not(c) => !c.matches(metadata, document),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            FilterCondition::Gt(field, value)
            | FilterCondition::Gte(field, value)
            | FilterCondition::Lt(field, value)
            | FilterCondition::Lte(field, value) => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err(Error::InvalidFilter(format!(
                        "ordering comparison on {field:?} needs a numeric operand, got {value}"
                    )))
                }
            }
            FilterCondition::In(field, values) | FilterCondition::NotIn(field, values) => {
                if values.is_empty() {
                    Err(Error::InvalidFilter(format!(
                        "membership test on {field:?} needs at least one value"
                    )))
                } else {
                    Ok(())
                }
            }
            FilterCondition::DocumentContains(substring) if substring.is_empty() => Err(
                Error::InvalidFilter("document substring must not be empty".into()),
            ),
            FilterCondition::And(a, b) | FilterCondition::Or(a, b) => {
                a.validate()?;
                b.validate()
            }
            FilterCondition::Not(c) => c.validate(),
            _ => Ok(()),
        }
    }
}

/// Numbers compare by value across int/float; everything else structurally.
fn values_equal(a: &MetadataValue, b: &MetadataValue) -> bool {
    match (a.is_number(), b.is_number()) {
        (true, true) => a.as_f64() == b.as_f64(),
        _ => a == b,
    }
}

fn compare_values<F>(field_value: Option<&MetadataValue>, target: &MetadataValue, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (field_value.and_then(MetadataValue::as_f64), target.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record() -> Record {
        Record::new("hotel_policy_01", vec![0.0; 3])
            .with_document("Employees can book hotels up to $300 per night.")
            .with_metadata(
                Metadata::new()
                    .with_field("policy_type", "hotels")
                    .with_field("max_spend", 300)
                    .with_field("score", 0.95)
                    .with_field("active", true),
            )
    }

    #[test]
    fn test_filter_eq() {
        let r = test_record();
        assert!(Filter::field("policy_type").eq("hotels").matches(&r));
        assert!(!Filter::field("policy_type").eq("flights").matches(&r));
    }

    #[test]
    fn test_filter_eq_int_matches_float() {
        let r = test_record();
        assert!(Filter::field("max_spend").eq(300.0).matches(&r));
    }

    #[test]
    fn test_filter_ne() {
        let r = test_record();
        assert!(Filter::field("policy_type").ne("flights").matches(&r));
        assert!(Filter::field("missing").ne("x").matches(&r));
    }

    #[test]
    fn test_filter_numeric_comparisons() {
        let r = test_record();

        assert!(Filter::field("max_spend").gt(250).matches(&r));
        assert!(Filter::field("max_spend").gte(300).matches(&r));
        assert!(Filter::field("max_spend").lt(301).matches(&r));
        assert!(Filter::field("max_spend").lte(300).matches(&r));
        assert!(!Filter::field("policy_type").gt(1).matches(&r));
    }

    #[test]
    fn test_filter_in_and_not_in() {
        let r = test_record();
        assert!(Filter::field("policy_type")
            .contained_in(vec!["hotels", "flights"])
            .matches(&r));
        assert!(!Filter::field("policy_type")
            .contained_in(vec!["train", "rental_cars"])
            .matches(&r));
        assert!(Filter::field("policy_type")
            .not_in(vec!["train"])
            .matches(&r));
    }

    #[test]
    fn test_filter_contains_and_exists() {
        let r = test_record();
        assert!(Filter::field("policy_type").contains("hot").matches(&r));
        assert!(Filter::field("active").exists().matches(&r));
        assert!(!Filter::field("nonexistent").exists().matches(&r));
    }

    #[test]
    fn test_filter_document_contains() {
        let r = test_record();
        assert!(Filter::document_contains("$300").matches(&r));
        assert!(!Filter::document_contains("sedan").matches(&r));

        let bare = Record::new("x", vec![0.0; 3]);
        assert!(!Filter::document_contains("anything").matches(&bare));
    }

    #[test]
    fn test_filter_combinators() {
        let r = test_record();
        let filter = Filter::field("policy_type")
            .eq("hotels")
            .and(Filter::field("max_spend").gte(300));
        assert!(filter.matches(&r));

        let filter = Filter::field("policy_type")
            .eq("flights")
            .or(Filter::field("active").eq(true));
        assert!(filter.matches(&r));

        assert!(Filter::field("policy_type").eq("flights").negate().matches(&r));
    }

    #[test]
    fn test_filter_matches_metadata_only() {
        let metadata = Metadata::new().with_field("description", "archived");
        assert!(Filter::field("description").eq("archived").matches_metadata(&metadata));
        assert!(!Filter::document_contains("archived").matches_metadata(&metadata));
    }

    #[test]
    fn test_filter_validate() {
        assert!(Filter::field("max_spend").gt(10).validate().is_ok());
        assert!(matches!(
            Filter::field("max_spend").gt("ten").validate(),
            Err(Error::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::field("a")
                .eq(1)
                .and(Filter::field("b").contained_in(Vec::<i64>::new()))
                .validate(),
            Err(Error::InvalidFilter(_))
        ));
    }
}
