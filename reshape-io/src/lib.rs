//! Reshape I/O - Streaming layer around the tree transformer
//!
//! This crate connects the transformer to the outside world:
//!
//! - Pull sources ([`PullSource`], [`IterSource`], [`NdjsonSource`])
//! - The transform stage ([`ObjectStream`]) emitting `data` and `end`
//! - The sink adapter ([`ObjectStream::pipe`] / [`ObjectStream::unpipe`])
//! - Push sinks ([`PushSink`], [`CollectSink`], [`NdjsonSink`])
//!
//! # Example
//!
//! ```
//! use reshape_engine::{FieldMapEntry, TransformOptions};
//! use reshape_io::{readable_stream_from, CollectSink, ObjectStream};
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! let options = TransformOptions::builder("row")
//!     .field_maps(vec![FieldMapEntry::new("id", "key", "row")])
//!     .build()
//!     .unwrap();
//! let stream = ObjectStream::new(readable_stream_from(vec![json!({"id": 1})]), options);
//!
//! let sink = stream.pipe(Rc::new(CollectSink::new())).unwrap();
//! assert_eq!(sink.items(), vec![json!({"key": 1})]);
//! assert!(sink.is_ended());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ndjson;
pub mod pipe;
pub mod sink;
pub mod source;
pub mod stream;

pub use error::{Result, StreamError, StreamId};
pub use ndjson::{NdjsonSink, NdjsonSource, OutputFormat};
pub use pipe::PipeStatus;
pub use sink::{
    CollectSink, ListenerId, PushSink, SinkEvent, SinkEventKind, SinkEvents, UnpipeInfo,
};
pub use source::{readable_stream_from, IterSource, PullSource};
pub use stream::{Items, ObjectStream};

use reshape_engine::TransformOptions;
use serde_json::Value;
use std::rc::Rc;

/// Iterator over the transformed items of an in-memory sequence
#[derive(Debug)]
pub struct TransformIter {
    stream: Rc<ObjectStream>,
}

impl TransformIter {
    /// The stream driving this iterator
    pub fn stream(&self) -> &Rc<ObjectStream> {
        &self.stream
    }
}

impl Iterator for TransformIter {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.read().transpose()
    }
}

/// Lazily transform every item of `items`
pub fn transform_iterable<I>(items: I, options: TransformOptions) -> TransformIter
where
    I: IntoIterator<Item = Value>,
    I::IntoIter: 'static,
{
    TransformIter {
        stream: ObjectStream::new(readable_stream_from(items), options),
    }
}

/// Transform every item of `items` and collect the results
pub fn transform_objects<I>(items: I, options: TransformOptions) -> Result<Vec<Value>>
where
    I: IntoIterator<Item = Value>,
    I::IntoIter: 'static,
{
    transform_iterable(items, options).collect()
}
