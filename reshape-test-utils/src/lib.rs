//! Reshape Test Utilities
//!
//! Shared builders, generators and fixtures for the reshape test suites.

use serde_json::{Map, Value};

pub mod fixtures;

/// Builder for creating test records with common patterns
///
/// Fields keep their insertion order.
pub struct RecordBuilder {
    fields: Map<String, Value>,
}

impl RecordBuilder {
    /// Create a new record builder
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Add a field with a string value
    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.fields
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a field with an integer value
    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), Value::from(value));
        self
    }

    /// Add a field with a boolean value
    pub fn bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), Value::Bool(value));
        self
    }

    /// Add a field with a null value
    pub fn null(mut self, key: &str) -> Self {
        self.fields.insert(key.to_string(), Value::Null);
        self
    }

    /// Add a field with an object value
    pub fn object(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Add a field with an array value
    pub fn array(mut self, key: &str, value: Vec<Value>) -> Self {
        self.fields.insert(key.to_string(), Value::Array(value));
        self
    }

    /// Build the record
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate test data with various shapes
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// One record nested `depth` objects deep under `next`
    pub fn deeply_nested_record(depth: usize) -> Value {
        let mut nested = RecordBuilder::new().string("leaf", "bottom").build();
        for level in (0..depth).rev() {
            nested = RecordBuilder::new()
                .int("level", level as i64)
                .object("next", nested)
                .build();
        }
        nested
    }

    /// A record whose `items` sequence mixes scalars, sequences and objects
    pub fn mixed_sequence_record() -> Value {
        RecordBuilder::new()
            .string("id", "mixed")
            .array(
                "items",
                vec![
                    Value::from(1),
                    Value::from("two"),
                    Value::Array(vec![Value::from(3), Value::Array(vec![Value::from(4)])]),
                    RecordBuilder::new().string("name", "five").build(),
                    Value::Null,
                ],
            )
            .build()
    }

    /// Flat log-style records for volume tests
    pub fn large_record_set(count: usize) -> Vec<Value> {
        let mut records = Vec::with_capacity(count);

        for i in 0..count {
            let level = match i % 4 {
                0 => "DEBUG",
                1 => "INFO",
                2 => "WARN",
                _ => "ERROR",
            };

            records.push(
                RecordBuilder::new()
                    .int("id", i as i64)
                    .int("timestamp", 1609459200 + i as i64)
                    .string("level", level)
                    .object(
                        "user",
                        RecordBuilder::new()
                            .string("name", &format!("user_{}", i % 100))
                            .int("uid", (i % 100) as i64)
                            .build(),
                    )
                    .array(
                        "tags",
                        vec![Value::from("a"), Value::from(format!("t{}", i % 7))],
                    )
                    .build(),
            );
        }

        records
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use serde_json::Value;

    /// Assert that two JSON values are equal, printing both on failure
    pub fn assert_json_equal(actual: &Value, expected: &Value, context: &str) {
        if actual != expected {
            panic!(
                "JSON assertion failed in {}:\nExpected: {}\nActual: {}",
                context,
                serde_json::to_string_pretty(expected).unwrap(),
                serde_json::to_string_pretty(actual).unwrap()
            );
        }
    }

    /// Assert that `key` appears nowhere in `value`, at any depth
    pub fn assert_key_absent(value: &Value, key: &str) {
        match value {
            Value::Object(map) => {
                assert!(
                    !map.contains_key(key),
                    "key '{}' unexpectedly present in {}",
                    key,
                    value
                );
                map.values().for_each(|v| assert_key_absent(v, key));
            }
            Value::Array(items) => items.iter().for_each(|v| assert_key_absent(v, key)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder_keeps_order() {
        let record = RecordBuilder::new()
            .string("name", "test")
            .int("age", 25)
            .bool("active", true)
            .null("gone")
            .build();

        let keys: Vec<&String> = record.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "age", "active", "gone"]);
        assert_eq!(record["age"], 25);
    }

    #[test]
    fn test_deeply_nested_record() {
        let record = TestDataGenerator::deeply_nested_record(3);
        assert_eq!(record["next"]["next"]["level"], 2);
        assert_eq!(record["next"]["next"]["next"]["leaf"], "bottom");
    }

    #[test]
    fn test_large_record_set() {
        let records = TestDataGenerator::large_record_set(1000);
        assert_eq!(records.len(), 1000);

        let mut users = std::collections::HashSet::new();
        for record in &records {
            users.insert(record["user"]["name"].as_str().unwrap().to_string());
        }
        assert_eq!(users.len(), 100);
    }

    #[test]
    #[should_panic(expected = "unexpectedly present")]
    fn test_assert_key_absent_finds_nested_keys() {
        let value = serde_json::json!({"a": [{"b": {"secret": 1}}]});
        assertions::assert_key_absent(&value, "secret");
    }
}
