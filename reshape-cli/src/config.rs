//! Declarative configuration file for the `reshape` binary
//!
//! A config file is TOML (`.toml`) or JSON (`.json`):
//!
//! ```toml
//! root_name = "root"
//! skip_props = ["type"]
//! unmapped = "drop"
//! object_name = "tag"
//! flatten = ["bark"]
//!
//! [[field_maps]]
//! field_name = "name"
//! property_name = "profile.name"
//! object_name = "root"
//!
//! [[custom_tags]]
//! base = "object"
//! tag = "duck"
//! field = "type"
//! equals = "duck"
//! ```

use reshape_engine::{
    FieldMapEntry, FieldMapper, ReshapeError, TransformOptions, UnmappedFields, ValueKind,
};
use reshape_format::path;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or applying a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The TOML did not match the config schema
    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    /// The JSON did not match the config schema
    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    /// The extension is neither `.toml` nor `.json`
    #[error("Unsupported config format {0:?} (expected .toml or .json)")]
    UnsupportedFormat(String),
    /// Field maps or custom tags were rejected
    #[error(transparent)]
    Format(#[from] ReshapeError),
}

/// How child object names are chosen during recursion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectNamePolicy {
    /// Nested objects keep their parent's object name
    #[default]
    Inherit,
    /// Nested objects carrying a custom tag are named after it
    Tag,
}

/// A custom type tag matched by comparing one field of the value
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomTagConfig {
    /// Built-in kind the tag refines
    pub base: String,
    /// Tag name
    pub tag: String,
    /// Dotted path inside the value to inspect; the value itself when absent
    #[serde(default)]
    pub field: Option<String>,
    /// Required value at `field`; presence alone matches when absent
    #[serde(default)]
    pub equals: Option<Value>,
}

impl CustomTagConfig {
    fn matches(&self, value: &Value) -> bool {
        let target = match &self.field {
            Some(field) => path::get_dotted(value, field),
            None => Some(value),
        };

        match (target, &self.equals) {
            (Some(found), Some(expected)) => found == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Contents of a config file. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReshapeConfig {
    /// Object name for top-level records (`"root"` by default)
    pub root_name: String,
    /// Output property names to always omit
    pub skip_props: Vec<String>,
    /// Policy for fields without a rename rule
    pub unmapped: UnmappedFields,
    /// Rename rules
    pub field_maps: Vec<FieldMapEntry>,
    /// Declarative custom type tags
    pub custom_tags: Vec<CustomTagConfig>,
    /// How nested objects pick their object name
    pub object_name: ObjectNamePolicy,
    /// Type tags whose nested results merge into the parent
    pub flatten: Vec<String>,
}

impl Default for ReshapeConfig {
    fn default() -> Self {
        Self {
            root_name: "root".to_string(),
            skip_props: Vec::new(),
            unmapped: UnmappedFields::default(),
            field_maps: Vec::new(),
            custom_tags: Vec::new(),
            object_name: ObjectNamePolicy::default(),
            flatten: Vec::new(),
        }
    }
}

impl ReshapeConfig {
    /// Load a config file, choosing the parser by extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_ascii_lowercase())
        {
            Some(ext) if ext == "toml" => Self::from_toml(&text),
            Some(ext) if ext == "json" => Self::from_json(&text),
            other => Err(ConfigError::UnsupportedFormat(other.unwrap_or_default())),
        }
    }

    /// Parse TOML config text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parse JSON config text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validated field maps grouped by object name
    pub fn field_mapper(&self) -> Result<FieldMapper, ConfigError> {
        Ok(FieldMapper::from_entries(self.field_maps.iter().cloned())?)
    }

    /// Build transform options, wiring the object name and flatten policies
    /// as hooks
    pub fn to_options(&self) -> Result<TransformOptions, ConfigError> {
        let mut builder = TransformOptions::builder(self.root_name.clone())
            .skip_props(self.skip_props.iter().cloned())
            .unmapped(self.unmapped)
            .field_mapper(self.field_mapper()?);

        for rule in &self.custom_tags {
            let base: ValueKind = rule.base.parse()?;
            let matcher = rule.clone();
            builder = builder.custom_tag(base, rule.tag.clone(), move |value| {
                matcher.matches(value)
            });
        }

        if self.object_name == ObjectNamePolicy::Tag {
            builder = builder
                .on_object_name(|_, tag, _| tag.is_custom().then(|| tag.as_str().to_string()));
        }

        if !self.flatten.is_empty() {
            let flatten = self.flatten.clone();
            builder = builder.on_fold(move |fold, _, tag| {
                flatten
                    .iter()
                    .any(|name| tag.is(name))
                    .then(|| fold.clone().flatten())
            });
        }

        Ok(builder.build()?)
    }
}
