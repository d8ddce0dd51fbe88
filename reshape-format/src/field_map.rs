//! Field maps: per-object-name rename rules
//!
//! A [`FieldMapEntry`] says "under object name `object_name`, the source field
//! `field_name` becomes the output property `property_name`". Both names may be
//! dotted paths. Entries are grouped into one [`ObjectMap`] per object name.

use crate::error::{ReshapeError, Result};
use crate::path::FieldPath;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A single rename rule as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapEntry {
    /// Source field (may be dotted)
    #[serde(alias = "fieldName")]
    pub field_name: String,
    /// Output property (may be dotted)
    #[serde(alias = "propertyName")]
    pub property_name: String,
    /// Object name scope the rule applies to
    #[serde(alias = "objectName")]
    pub object_name: String,
}

impl FieldMapEntry {
    /// Create a new entry
    pub fn new(
        field_name: impl Into<String>,
        property_name: impl Into<String>,
        object_name: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            property_name: property_name.into(),
            object_name: object_name.into(),
        }
    }

    /// Reject entries with empty components
    pub fn validate(&self) -> Result<()> {
        let missing = if self.field_name.is_empty() {
            "field_name"
        } else if self.property_name.is_empty() {
            "property_name"
        } else if self.object_name.is_empty() {
            "object_name"
        } else {
            return Ok(());
        };

        Err(ReshapeError::InvalidFieldMap(format!(
            "entry {:?} -> {:?} under {:?} has an empty {}",
            self.field_name, self.property_name, self.object_name, missing
        )))
    }
}

/// Resolved rename rule inside an [`ObjectMap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    /// Source field as declared
    pub field_name: String,
    /// Parsed source path
    pub field_path: FieldPath,
    /// Output property as declared
    pub property_name: String,
    /// Parsed output path
    pub property_path: FieldPath,
}

/// Rename rules for one object name
#[derive(Debug, Clone, Default)]
pub struct ObjectMap {
    name: String,
    rules: Vec<FieldRule>,
    index: AHashMap<String, usize>,
}

impl ObjectMap {
    /// Empty map for `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            index: AHashMap::new(),
        }
    }

    /// Object name this map belongs to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add or replace the rule for `field_name`.
    ///
    /// A replaced rule keeps its original declaration position.
    pub fn insert(&mut self, field_name: &str, property_name: &str) {
        let rule = FieldRule {
            field_name: field_name.to_string(),
            field_path: FieldPath::parse(field_name),
            property_name: property_name.to_string(),
            property_path: FieldPath::parse(property_name),
        };

        match self.index.get(field_name) {
            Some(&pos) => self.rules[pos] = rule,
            None => {
                self.index.insert(field_name.to_string(), self.rules.len());
                self.rules.push(rule);
            }
        }
    }

    /// Rule for a source field, if one is declared
    pub fn field_map(&self, field_name: &str) -> Option<&FieldRule> {
        self.index.get(field_name).map(|&pos| &self.rules[pos])
    }

    /// Declared source paths in declaration order
    pub fn field_paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.rules.iter().map(|rule| &rule.field_path)
    }

    /// All rules in declaration order
    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rules are declared
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Source of [`ObjectMap`]s keyed by object name.
///
/// `None` means "no rules for this name"; callers treat it as an empty map.
pub trait FieldMapProvider {
    /// Look up the map for an object name
    fn object_map(&self, object_name: &str) -> Option<&ObjectMap>;
}

/// In-memory [`FieldMapProvider`] built from entries
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    objects: AHashMap<String, ObjectMap>,
    order: Vec<String>,
}

impl FieldMapper {
    /// Mapper with no rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapper from entries, validating each one
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = FieldMapEntry>,
    {
        let mut mapper = Self::new();
        for entry in entries {
            mapper.insert(&entry)?;
        }
        Ok(mapper)
    }

    /// Add one entry
    pub fn insert(&mut self, entry: &FieldMapEntry) -> Result<()> {
        entry.validate()?;

        if !self.objects.contains_key(&entry.object_name) {
            self.order.push(entry.object_name.clone());
        }
        self.objects
            .entry(entry.object_name.clone())
            .or_insert_with(|| ObjectMap::new(entry.object_name.clone()))
            .insert(&entry.field_name, &entry.property_name);
        Ok(())
    }

    /// Object names in first-declaration order
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of object names with at least one rule
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when no rules are declared
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl FieldMapProvider for FieldMapper {
    fn object_map(&self, object_name: &str) -> Option<&ObjectMap> {
        self.objects.get(object_name)
    }
}
