//! Transform options and their builder

use crate::events::{Fold, Hook};
use ahash::AHashSet;
use reshape_format::{
    FieldMapEntry, FieldMapProvider, FieldMapper, Result, TypeClassifier, TypeTag, ValueKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// What happens to a field that has no rename rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedFields {
    /// Omit the field from the output
    #[default]
    Drop,
    /// Keep the field under its source key
    KeepSourceKey,
}

/// Immutable configuration of a [`TreeTransformer`](crate::TreeTransformer)
pub struct TransformOptions {
    pub(crate) root_name: String,
    pub(crate) skip_props: AHashSet<String>,
    pub(crate) unmapped: UnmappedFields,
    pub(crate) field_maps: Rc<dyn FieldMapProvider>,
    pub(crate) classifier: TypeClassifier,
    pub(crate) hooks: Vec<Hook>,
}

impl TransformOptions {
    /// Start building options whose recursion begins at `root_name`
    pub fn builder(root_name: impl Into<String>) -> TransformOptionsBuilder {
        TransformOptionsBuilder::new(root_name)
    }

    /// Object name used for top-level items
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Whether an output property is always omitted
    pub fn is_skipped(&self, property_name: &str) -> bool {
        self.skip_props.contains(property_name)
    }

    /// Policy for fields without a rename rule
    pub fn unmapped(&self) -> UnmappedFields {
        self.unmapped
    }

    /// Field map provider
    pub fn field_maps(&self) -> &dyn FieldMapProvider {
        self.field_maps.as_ref()
    }

    /// Type classifier
    pub fn classifier(&self) -> &TypeClassifier {
        &self.classifier
    }
}

impl fmt::Debug for TransformOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformOptions")
            .field("root_name", &self.root_name)
            .field("skip_props", &self.skip_props)
            .field("unmapped", &self.unmapped)
            .field("classifier", &self.classifier)
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// Builder for [`TransformOptions`]
pub struct TransformOptionsBuilder {
    root_name: String,
    skip_props: AHashSet<String>,
    unmapped: UnmappedFields,
    entries: Option<Vec<FieldMapEntry>>,
    provider: Option<Rc<dyn FieldMapProvider>>,
    classifier: TypeClassifier,
    hooks: Vec<Hook>,
}

impl TransformOptionsBuilder {
    fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            skip_props: AHashSet::new(),
            unmapped: UnmappedFields::default(),
            entries: None,
            provider: None,
            classifier: TypeClassifier::new(),
            hooks: Vec::new(),
        }
    }

    /// Output property names to always omit
    pub fn skip_props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_props.extend(props.into_iter().map(Into::into));
        self
    }

    /// Policy for fields without a rename rule
    pub fn unmapped(mut self, policy: UnmappedFields) -> Self {
        self.unmapped = policy;
        self
    }

    /// Rename rules as entries. Takes precedence over [`Self::field_mapper`].
    pub fn field_maps<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = FieldMapEntry>,
    {
        self.entries
            .get_or_insert_with(Vec::new)
            .extend(entries);
        self
    }

    /// A ready-made field map provider
    pub fn field_mapper<P>(mut self, provider: P) -> Self
    where
        P: FieldMapProvider + 'static,
    {
        self.provider = Some(Rc::new(provider));
        self
    }

    /// Replace the type classifier
    pub fn classifier(mut self, classifier: TypeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Register a custom type tag on the classifier
    pub fn custom_tag<F>(mut self, base: ValueKind, tag: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.classifier.register_custom_tag(base, tag, predicate);
        self
    }

    /// Add a hook of any kind
    pub fn hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Add an `entry` hook
    pub fn on_entry<F>(self, f: F) -> Self
    where
        F: Fn(&Value, &str, &TypeTag) -> Option<Value> + 'static,
    {
        self.hook(Hook::entry(f))
    }

    /// Add a `leaf` hook
    pub fn on_leaf<F>(self, f: F) -> Self
    where
        F: Fn(&Value, usize, &TypeTag) -> Option<Value> + 'static,
    {
        self.hook(Hook::leaf(f))
    }

    /// Add a `branch` hook
    pub fn on_branch<F>(self, f: F) -> Self
    where
        F: Fn(&[Value], &TypeTag) -> Option<Vec<Value>> + 'static,
    {
        self.hook(Hook::branch(f))
    }

    /// Add an `object_name` hook
    pub fn on_object_name<F>(self, f: F) -> Self
    where
        F: Fn(&str, &TypeTag, &Value) -> Option<String> + 'static,
    {
        self.hook(Hook::object_name(f))
    }

    /// Add a `fold` hook
    pub fn on_fold<F>(self, f: F) -> Self
    where
        F: Fn(&Fold, &str, &TypeTag) -> Option<Fold> + 'static,
    {
        self.hook(Hook::fold(f))
    }

    /// Finish building. Fails only when a field map entry is invalid.
    pub fn build(self) -> Result<TransformOptions> {
        let field_maps: Rc<dyn FieldMapProvider> = match (self.entries, self.provider) {
            (Some(entries), _) => Rc::new(FieldMapper::from_entries(entries)?),
            (None, Some(provider)) => provider,
            (None, None) => Rc::new(FieldMapper::new()),
        };

        Ok(TransformOptions {
            root_name: self.root_name,
            skip_props: self.skip_props,
            unmapped: self.unmapped,
            field_maps,
            classifier: self.classifier,
            hooks: self.hooks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reshape_format::ReshapeError;

    #[test]
    fn defaults() {
        let options = TransformOptions::builder("root").build().unwrap();
        assert_eq!(options.root_name(), "root");
        assert_eq!(options.unmapped(), UnmappedFields::Drop);
        assert!(options.field_maps().object_map("root").is_none());
        assert!(options.classifier().is_empty());
        assert!(!options.is_skipped("anything"));
    }

    #[test]
    fn entries_take_precedence_over_mapper() {
        let mapper =
            FieldMapper::from_entries(vec![FieldMapEntry::new("a", "from_mapper", "root")])
                .unwrap();
        let options = TransformOptions::builder("root")
            .field_mapper(mapper)
            .field_maps(vec![FieldMapEntry::new("a", "from_entries", "root")])
            .build()
            .unwrap();

        let rule = options
            .field_maps()
            .object_map("root")
            .and_then(|map| map.field_map("a"))
            .unwrap();
        assert_eq!(rule.property_name, "from_entries");
    }

    #[test]
    fn invalid_entry_fails_build() {
        let result = TransformOptions::builder("root")
            .field_maps(vec![FieldMapEntry::new("", "b", "root")])
            .build();
        assert!(matches!(result, Err(ReshapeError::InvalidFieldMap(_))));
    }

    #[test]
    fn skip_props_and_custom_tags_accumulate() {
        let options = TransformOptions::builder("root")
            .skip_props(["prop"])
            .skip_props(vec!["type".to_string()])
            .custom_tag(ValueKind::Object, "duck", |v| v["type"] == "duck")
            .build()
            .unwrap();

        assert!(options.is_skipped("prop"));
        assert!(options.is_skipped("type"));
        assert_eq!(options.classifier().len(), 1);
    }

    #[test]
    fn unmapped_policy_deserializes() {
        let policy: UnmappedFields = serde_json::from_str("\"keep_source_key\"").unwrap();
        assert_eq!(policy, UnmappedFields::KeepSourceKey);
    }
}
