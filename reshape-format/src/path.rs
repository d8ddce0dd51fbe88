//! Dotted-path access over keyed maps
//!
//! A path is either a dotted string (`"meta.owner.id"`) or a pre-split list of
//! segments. The empty path addresses the root itself: reads return the root
//! and writes are ignored.

use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt;

/// Parsed path into a keyed tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: SmallVec<[String; 4]>,
}

impl FieldPath {
    /// The empty path (addresses the root)
    pub fn root() -> Self {
        Self::default()
    }

    /// Split a dotted string into segments. `""` yields the root path.
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    /// Build a path from already-split segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Path segments in traversal order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True for the root path
    pub fn is_empty(&self) -> bool {
        self.is_root()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<&String> for FieldPath {
    fn from(path: &String) -> Self {
        Self::parse(path)
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<Vec<String>> for FieldPath {
    fn from(segments: Vec<String>) -> Self {
        Self::from_segments(segments)
    }
}

impl From<&[&str]> for FieldPath {
    fn from(segments: &[&str]) -> Self {
        Self::from_segments(segments.iter().copied())
    }
}

/// Read the value at `path`.
///
/// Returns `None` as soon as an intermediate value is missing, `null`, or a
/// scalar. Array elements are addressed by decimal index segments.
pub fn get<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = root;

    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Write `value` at `path`, creating missing intermediate maps.
///
/// An intermediate that exists but is not a keyed map is replaced by an empty
/// map. The final segment always overwrites.
pub fn set(root: &mut Map<String, Value>, path: &FieldPath, value: Value) {
    let Some((last, parents)) = path.segments().split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot.as_object_mut() {
            Some(map) => map,
            None => return,
        };
    }

    current.insert(last.clone(), value);
}

/// [`get`] with a dotted string path
pub fn get_dotted<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    get(root, &FieldPath::parse(path))
}

/// [`set`] with a dotted string path
pub fn set_dotted(root: &mut Map<String, Value>, path: &str, value: Value) {
    set(root, &FieldPath::parse(path), value)
}
