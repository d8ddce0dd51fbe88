//! Reshape Engine - Recursive tree transformer
//!
//! This crate rewrites keyed JSON trees into differently-shaped trees:
//!
//! - An event hub holding ordered mutation hooks and lifecycle listeners
//! - Transform options (root name, skipped properties, field maps, classifier)
//! - The recursive transformer that applies field maps and runs the hooks
//!
//! # Example
//!
//! ```
//! use reshape_engine::{FieldMapEntry, TransformOptions, TreeTransformer};
//! use serde_json::json;
//!
//! let options = TransformOptions::builder("user")
//!     .field_maps(vec![
//!         FieldMapEntry::new("first", "name.given", "user"),
//!         FieldMapEntry::new("last", "name.family", "user"),
//!     ])
//!     .build()
//!     .unwrap();
//! let transformer = TreeTransformer::new(options);
//!
//! let out = transformer.transform_root(&json!({"first": "Ada", "last": "Lovelace"}));
//! assert_eq!(out, json!({"name": {"given": "Ada", "family": "Lovelace"}}));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod events;
pub mod options;
pub mod transformer;

// Re-export commonly used types
pub use reshape_format::{
    FieldMapEntry, FieldMapProvider, FieldMapper, FieldPath, ObjectMap, ReshapeError, Result,
    TypeClassifier, TypeTag, ValueKind,
};

// Re-export our own types
pub use events::{EventHub, EventKind, Fold, Hook, HookId};
pub use options::{TransformOptions, TransformOptionsBuilder, UnmappedFields};
pub use transformer::TreeTransformer;
