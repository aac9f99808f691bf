use crate::labels::{Map, Selector};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A match predicate plus the annotations applied when it holds.
///
/// Every match field is optional; an unset field constrains nothing. A rule
/// with no match fields at all applies to every resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rule {
    pub(crate) name: Option<String>,
    pub(crate) namespace: Option<String>,
    pub(crate) kind: Option<String>,
    pub(crate) resource_name: Option<String>,
    pub(crate) labels: Selector,
    pub(crate) annotations: Map,
}

/// An ordered, immutable list of rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleSet(Vec<Rule>);

/// Selects a named rule in the map form of the configuration.
pub const RULE_LABEL: &str = "resource-annotator.fehe.eu/rule";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rules must be a list or a map of named rules, got {0}")]
    Malformed(&'static str),

    #[error("rule {index} is invalid: {source}")]
    InvalidRule {
        index: usize,
        source: serde_json::Error,
    },

    #[error("rule {index} sets an annotation with an empty key")]
    EmptyAnnotationKey { index: usize },

    #[error("rule {name:?} is invalid: {source}")]
    InvalidNamedRule {
        name: String,
        source: serde_json::Error,
    },

    #[error("rule {name:?} sets an annotation with an empty key")]
    EmptyNamedAnnotationKey { name: String },
}

/// The serialized form of a rule.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RuleSpec {
    name: Option<String>,
    match_namespace: Option<String>,
    match_kind: Option<String>,
    match_name: Option<String>,
    match_labels: Option<Map>,
    annotations: Option<Map>,
}

// === impl RuleSet ===

impl RuleSet {
    /// Reads deserialized rules.
    ///
    /// Rules are either a list of rule objects or a map from a rule name to
    /// the annotations it sets. A named rule applies to resources whose
    /// [`RULE_LABEL`] label holds its name; since each selects a distinct
    /// label value, their order is irrelevant.
    ///
    /// `null` is read as an empty rule set. Empty match fields and empty
    /// annotation maps are valid.
    pub fn load(raw: Value) -> Result<Self, ConfigError> {
        let items = match raw {
            Value::Null => return Ok(Self::default()),
            Value::Array(items) => items,
            Value::Object(named) => return Self::load_named(named),
            other => return Err(ConfigError::Malformed(type_name(&other))),
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let spec = serde_json::from_value::<RuleSpec>(item)
                    .map_err(|source| ConfigError::InvalidRule { index, source })?;
                Rule::from_spec(index, spec)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    fn load_named(named: serde_json::Map<String, Value>) -> Result<Self, ConfigError> {
        named
            .into_iter()
            .map(|(name, annotations)| {
                let annotations = match serde_json::from_value::<Option<Map>>(annotations) {
                    Ok(annotations) => annotations.unwrap_or_default(),
                    Err(source) => return Err(ConfigError::InvalidNamedRule { name, source }),
                };
                if annotations.contains_key("") {
                    return Err(ConfigError::EmptyNamedAnnotationKey { name });
                }
                Ok(Rule {
                    labels: Some((RULE_LABEL.to_string(), name.clone())).into_iter().collect(),
                    name: non_empty(Some(name)),
                    annotations,
                    ..Rule::default()
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Rules in declaration order.
    #[inline]
    pub fn rules(&self) -> &[Rule] {
        &self.0
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::iter::FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

// === impl Rule ===

impl Rule {
    fn from_spec(index: usize, spec: RuleSpec) -> Result<Self, ConfigError> {
        let RuleSpec {
            name,
            match_namespace,
            match_kind,
            match_name,
            match_labels,
            annotations,
        } = spec;

        let annotations = annotations.unwrap_or_default();
        if annotations.contains_key("") {
            return Err(ConfigError::EmptyAnnotationKey { index });
        }

        Ok(Self {
            name: non_empty(name),
            namespace: non_empty(match_namespace),
            kind: non_empty(match_kind),
            resource_name: non_empty(match_name),
            labels: match_labels.map(Selector::from_map).unwrap_or_default(),
            annotations,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = non_empty(Some(name.into()));
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = non_empty(Some(namespace.into()));
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = non_empty(Some(kind.into()));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = non_empty(Some(name.into()));
        self
    }

    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<Map>()
            .into();
        self
    }

    pub fn with_annotations<I, K, V>(mut self, annotations: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.annotations = annotations
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// The operator-facing name of this rule, if one was configured.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}
