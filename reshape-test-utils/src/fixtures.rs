//! The animal fixture
//!
//! A record whose nested objects are told apart by custom type tags (`duck`,
//! `dog`, `bark`, `cow`). Tagged objects are transformed under their tag as
//! object name, and `bark` objects fold into their parent.

use reshape_format::{FieldMapEntry, TypeClassifier, ValueKind};
use serde_json::{json, Value};

/// Object name of top-level records
pub const ROOT_NAME: &str = "root";

/// Output properties that never appear
pub const SKIP_PROPS: [&str; 2] = ["prop", "type"];

/// Tags that become object names for nested recursion
pub const NAMED_TAGS: [&str; 4] = ["duck", "dog", "bark", "cow"];

/// Tag whose nested result folds into its parent
pub const FLATTEN_TAG: &str = "bark";

/// Rename rules
pub fn field_maps() -> Vec<FieldMapEntry> {
    vec![
        FieldMapEntry::new("another", "property1", "root"),
        FieldMapEntry::new("array", "property2", "root"),
        FieldMapEntry::new("message", "property3", "duck"),
        FieldMapEntry::new("bark", "property4", "dog"),
        FieldMapEntry::new("woof", "property5", "bark"),
        FieldMapEntry::new("chews", "property6", "cow"),
        FieldMapEntry::new("obj", "property7", "root"),
    ]
}

/// Classifier with the four animal tags registered
pub fn classifier() -> TypeClassifier {
    let mut classifier = TypeClassifier::new();
    classifier
        .register_custom_tag(ValueKind::Object, "duck", |v| v["type"] == "duck")
        .register_custom_tag(ValueKind::Object, "dog", |v| v["type"] == "dog")
        .register_custom_tag(ValueKind::Object, "bark", |v| v["woof"] == "bow wow")
        .register_custom_tag(ValueKind::Object, "cow", |v| v["type"] == "cow");
    classifier
}

/// Input record
pub fn record() -> Value {
    json!({
        "prop": "skip me",
        "another": "wont skip",
        "array": [
            "hello",
            {
                "type": "duck",
                "message": "walks like one"
            },
            [
                12,
                [true],
                {
                    "type": "dog",
                    "bark": {
                        "prop": "skip me, too",
                        "woof": "bow wow"
                    }
                }
            ]
        ],
        "obj": {
            "type": "cow",
            "chews": "grass"
        }
    })
}

/// Expected output for [`record`]
pub fn expected() -> Value {
    json!({
        "property1": "wont skip",
        "property2": [
            "hello",
            {
                "property3": "walks like one"
            },
            [
                12,
                [true],
                {
                    "property5": "bow wow"
                }
            ]
        ],
        "property7": {
            "property6": "grass"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_tags_fixture_objects() {
        let classifier = classifier();
        let record = record();

        assert!(classifier.classify(&record["array"][1]).is("duck"));
        assert!(classifier.classify(&record["array"][2][2]).is("dog"));
        assert!(classifier.classify(&record["array"][2][2]["bark"]).is("bark"));
        assert!(classifier.classify(&record["obj"]).is("cow"));
        assert!(classifier.classify(&record).is("object"));
    }
}
