//! Reshape Format - Core primitives for tree reshaping
//!
//! This crate provides the building blocks the reshape engine works with,
//! with no I/O dependencies:
//!
//! - Dotted-path get/set over `serde_json` trees
//! - Value kinds, type tags and an instance-scoped custom tag registry
//! - Field maps grouped by object name
//! - Error types

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod field_map;
pub mod path;
pub mod types;

// Re-export commonly used types
pub use error::{ReshapeError, Result};
pub use field_map::{FieldMapEntry, FieldMapProvider, FieldMapper, FieldRule, ObjectMap};
pub use path::FieldPath;
pub use types::{TypeClassifier, TypeTag, ValueKind};
