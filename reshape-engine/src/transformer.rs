//! Recursive tree transformer
//!
//! For one keyed object and its object name the transformer:
//!
//! 1. looks up the object's [`ObjectMap`] (absent means no rules),
//! 2. builds the working field set: declared field paths first, then the
//!    object's own keys not already declared, in iteration order,
//! 3. renames, hooks and recurses into each field, writing the result at its
//!    (possibly dotted) property path.
//!
//! The input is never modified; every output container is freshly built.

use crate::events::{EventHub, Fold};
use crate::options::{TransformOptions, UnmappedFields};
use reshape_format::path::{self, FieldPath};
use reshape_format::{ObjectMap, TypeTag};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::rc::Rc;
use tracing::trace;

/// One field selected for processing
struct WorkingField<'a> {
    field_name: Cow<'a, str>,
    property_name: Cow<'a, str>,
    property_path: Cow<'a, FieldPath>,
    value: Value,
}

/// Rewrites keyed trees according to field maps and hooks
pub struct TreeTransformer {
    options: TransformOptions,
    hub: Rc<EventHub>,
}

impl TreeTransformer {
    /// Create a transformer, registering the hooks carried by `options`
    pub fn new(options: TransformOptions) -> Self {
        Self::with_hub(options, Rc::new(EventHub::new()))
    }

    /// Create a transformer on an existing hub
    pub fn with_hub(mut options: TransformOptions, hub: Rc<EventHub>) -> Self {
        for hook in options.hooks.drain(..) {
            hub.on(hook);
        }
        Self { options, hub }
    }

    /// Hub the transformer emits on
    pub fn hub(&self) -> &Rc<EventHub> {
        &self.hub
    }

    /// Options the transformer was built with
    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Transform a top-level item under the configured root name
    pub fn transform_root(&self, input: &Value) -> Value {
        self.transform(input, &self.options.root_name)
    }

    /// Transform `input` under object name `name`.
    ///
    /// Non-object inputs have no fields and produce an empty object.
    pub fn transform(&self, input: &Value, name: &str) -> Value {
        Value::Object(self.transform_owned(input.clone(), name))
    }

    /// Owned variant of [`Self::transform`]
    pub fn transform_owned(&self, input: Value, name: &str) -> Map<String, Value> {
        let mut output = Map::new();
        let object_map = self.options.field_maps.object_map(name);
        let fields = self.working_fields(input, object_map);

        trace!(object = name, fields = fields.len(), "transforming object");

        for field in fields {
            self.visit_field(&mut output, field, name);
        }

        output
    }

    fn working_fields<'a>(
        &self,
        input: Value,
        object_map: Option<&'a ObjectMap>,
    ) -> Vec<WorkingField<'a>> {
        let mut fields = Vec::new();

        if let Some(object_map) = object_map {
            for rule in object_map.rules() {
                if let Some(value) = path::get(&input, &rule.field_path) {
                    fields.push(WorkingField {
                        field_name: Cow::Borrowed(rule.field_name.as_str()),
                        property_name: Cow::Borrowed(rule.property_name.as_str()),
                        property_path: Cow::Borrowed(&rule.property_path),
                        value: value.clone(),
                    });
                }
            }
        }

        let Value::Object(own) = input else {
            return fields;
        };

        for (key, value) in own {
            if object_map.is_some_and(|map| map.field_map(&key).is_some()) {
                continue;
            }
            if self.options.unmapped == UnmappedFields::Drop {
                continue;
            }

            let property_path = FieldPath::from_segments([key.as_str()]);
            fields.push(WorkingField {
                field_name: Cow::Owned(key.clone()),
                property_name: Cow::Owned(key),
                property_path: Cow::Owned(property_path),
                value,
            });
        }

        fields
    }

    fn visit_field(&self, output: &mut Map<String, Value>, field: WorkingField<'_>, name: &str) {
        if self.options.is_skipped(&field.property_name) {
            return;
        }

        let tag = self.options.classifier.classify(&field.value);
        let value = self.hub.emit_entry(field.value, &field.field_name, &tag);

        match value {
            Value::Array(items) => {
                let mapped = self.map_branch(items, &tag, name);
                path::set(output, &field.property_path, Value::Array(mapped));
            }
            value @ Value::Object(_) => {
                let nested = self.transform_nested(value, &tag, name);
                match self.hub.emit_fold(Fold::Nest(nested), &field.property_name, &tag) {
                    Fold::Flatten(nested) => {
                        for (key, value) in nested {
                            output.insert(key, value);
                        }
                    }
                    Fold::Nest(nested) => {
                        path::set(output, &field.property_path, Value::Object(nested));
                    }
                }
            }
            scalar => path::set(output, &field.property_path, scalar),
        }
    }

    fn map_branch(&self, items: Vec<Value>, tag: &TypeTag, name: &str) -> Vec<Value> {
        self.hub
            .emit_branch(items, tag)
            .into_iter()
            .enumerate()
            .map(|(index, element)| self.map_element(element, index, name))
            .collect()
    }

    fn map_element(&self, element: Value, index: usize, name: &str) -> Value {
        let tag = self.options.classifier.classify(&element);

        match self.hub.emit_leaf(element, index, &tag) {
            Value::Array(items) => Value::Array(self.map_branch(items, &tag, name)),
            leaf @ Value::Object(_) => Value::Object(self.transform_nested(leaf, &tag, name)),
            leaf => leaf,
        }
    }

    fn transform_nested(&self, value: Value, tag: &TypeTag, name: &str) -> Map<String, Value> {
        let child = self.hub.emit_object_name(name, tag, &value);
        self.transform_owned(value, &child)
    }
}

impl std::fmt::Debug for TreeTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeTransformer")
            .field("options", &self.options)
            .field("hub", &self.hub)
            .finish()
    }
}
