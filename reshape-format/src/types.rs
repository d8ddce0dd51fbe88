//! Value type tags and the custom tag registry

use crate::error::ReshapeError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Built-in value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Present but null
    Null,
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Non-integral number
    Decimal,
    /// String value
    String,
    /// Keyed map
    Object,
    /// Ordered sequence
    Array,
}

impl ValueKind {
    /// Built-in classification of a value
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Int,
            Value::Number(_) => ValueKind::Decimal,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Lowercase name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Decimal => "decimal",
            ValueKind::String => "string",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = ReshapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(ValueKind::Null),
            "bool" | "boolean" => Ok(ValueKind::Bool),
            "int" | "integer" => Ok(ValueKind::Int),
            "decimal" | "number" => Ok(ValueKind::Decimal),
            "string" => Ok(ValueKind::String),
            "object" => Ok(ValueKind::Object),
            "array" => Ok(ValueKind::Array),
            other => Err(ReshapeError::UnknownTypeKind(other.to_string())),
        }
    }
}

/// Classification result handed to hooks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// One of the built-in kinds
    Builtin(ValueKind),
    /// A registered custom tag refining `base`
    Custom {
        /// Kind the custom tag was registered under
        base: ValueKind,
        /// Custom tag name
        name: String,
    },
}

impl TypeTag {
    /// Tag name: the custom name, or the built-in kind name
    pub fn as_str(&self) -> &str {
        match self {
            TypeTag::Builtin(kind) => kind.as_str(),
            TypeTag::Custom { name, .. } => name,
        }
    }

    /// Underlying built-in kind
    pub fn base(&self) -> ValueKind {
        match self {
            TypeTag::Builtin(kind) => *kind,
            TypeTag::Custom { base, .. } => *base,
        }
    }

    /// Compare the tag name
    pub fn is(&self, name: &str) -> bool {
        self.as_str() == name
    }

    /// True when a custom predicate produced this tag
    pub fn is_custom(&self) -> bool {
        matches!(self, TypeTag::Custom { .. })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ValueKind> for TypeTag {
    fn from(kind: ValueKind) -> Self {
        TypeTag::Builtin(kind)
    }
}

/// Predicate deciding whether a value carries a custom tag
pub type TagPredicate = dyn Fn(&Value) -> bool;

struct CustomTagRule {
    base: ValueKind,
    tag: String,
    predicate: Box<TagPredicate>,
}

/// Classifies values into [`TypeTag`]s.
///
/// Custom tags are scoped to the classifier instance. For a value of base kind
/// `K`, the predicates registered under `K` are tried in registration order and
/// the first match wins; otherwise the built-in tag is returned.
#[derive(Default)]
pub struct TypeClassifier {
    rules: Vec<CustomTagRule>,
}

impl TypeClassifier {
    /// Classifier with no custom tags
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom tag for values of kind `base`
    pub fn register_custom_tag<F>(
        &mut self,
        base: ValueKind,
        tag: impl Into<String>,
        predicate: F,
    ) -> &mut Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.rules.push(CustomTagRule {
            base,
            tag: tag.into(),
            predicate: Box::new(predicate),
        });
        self
    }

    /// Classify a value
    pub fn classify(&self, value: &Value) -> TypeTag {
        let base = ValueKind::of(value);

        self.rules
            .iter()
            .filter(|rule| rule.base == base)
            .find(|rule| (rule.predicate)(value))
            .map(|rule| TypeTag::Custom {
                base,
                name: rule.tag.clone(),
            })
            .unwrap_or(TypeTag::Builtin(base))
    }

    /// Registered custom tags in registration order
    pub fn custom_tags(&self) -> impl Iterator<Item = (ValueKind, &str)> {
        self.rules.iter().map(|rule| (rule.base, rule.tag.as_str()))
    }

    /// Number of registered custom tags
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no custom tags are registered
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for TypeClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.custom_tags()).finish()
    }
}
