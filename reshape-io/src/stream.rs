//! Pull-based transform stage
//!
//! An [`ObjectStream`] draws items from a [`PullSource`], rewrites each one
//! with a [`TreeTransformer`] under the configured root name, and emits the
//! result on the transformer's hub as a `data` event. Exhaustion of the source,
//! or a `null` item, ends the stream and fires `end` exactly once.

use crate::error::{Result, StreamId};
use crate::pipe::PipeState;
use crate::source::PullSource;
use reshape_engine::{EventHub, Hook, HookId, TransformOptions, TreeTransformer};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Transform stage over a pull source
pub struct ObjectStream {
    id: StreamId,
    transformer: TreeTransformer,
    source: RefCell<Box<dyn PullSource>>,
    ended: Cell<bool>,
    emitted: Cell<u64>,
    pub(crate) pipe: RefCell<PipeState>,
    pub(crate) flowing: Cell<bool>,
    pub(crate) paused: Cell<bool>,
}

impl ObjectStream {
    /// Build a stream reading from `source` and transforming with `options`
    pub fn new<S>(source: S, options: TransformOptions) -> Rc<Self>
    where
        S: PullSource + 'static,
    {
        Self::from_transformer(source, TreeTransformer::new(options))
    }

    /// Build a stream around an existing transformer
    pub fn from_transformer<S>(source: S, transformer: TreeTransformer) -> Rc<Self>
    where
        S: PullSource + 'static,
    {
        Rc::new(Self {
            id: StreamId::next(),
            transformer,
            source: RefCell::new(Box::new(source)),
            ended: Cell::new(false),
            emitted: Cell::new(0),
            pipe: RefCell::new(PipeState::Unbound),
            flowing: Cell::new(false),
            paused: Cell::new(false),
        })
    }

    /// Identity used in `pipe`/`unpipe` signals
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// The underlying transformer
    pub fn transformer(&self) -> &TreeTransformer {
        &self.transformer
    }

    /// Hub carrying this stream's hooks and lifecycle events
    pub fn hub(&self) -> &Rc<EventHub> {
        self.transformer.hub()
    }

    /// Register a hook or listener
    pub fn on(&self, hook: Hook) -> HookId {
        self.hub().on(hook)
    }

    /// Register a hook or listener that runs once
    pub fn once(&self, hook: Hook) -> HookId {
        self.hub().once(hook)
    }

    /// Remove a hook or listener; unknown ids are ignored
    pub fn remove_listener(&self, id: HookId) -> bool {
        self.hub().remove(id)
    }

    /// Whether `end` has fired
    pub fn is_ended(&self) -> bool {
        self.ended.get()
    }

    /// Number of items emitted so far
    pub fn emitted(&self) -> u64 {
        self.emitted.get()
    }

    /// Pull, transform and emit the next item.
    ///
    /// Returns `Ok(None)` once the stream has ended. Source errors are
    /// returned as-is and do not end the stream.
    pub fn read(&self) -> Result<Option<Value>> {
        if self.ended.get() {
            return Ok(None);
        }

        let next = self.source.borrow_mut().read()?;
        let item = match next {
            None | Some(Value::Null) => {
                self.finish();
                return Ok(None);
            }
            Some(item) => item,
        };

        let output = self.transformer.transform_root(&item);
        let count = self.emitted.get() + 1;
        self.emitted.set(count);
        trace!(stream = %self.id, item = count, "emitting transformed item");

        self.hub().emit_data(&output);
        Ok(Some(output))
    }

    /// Iterate over the remaining transformed items
    pub fn iter(&self) -> Items<'_> {
        Items { stream: self }
    }

    /// End the stream, firing `end` once
    pub fn finish(&self) {
        if self.ended.replace(true) {
            return;
        }
        debug!(stream = %self.id, items = self.emitted.get(), "stream ended");
        self.hub().emit_end();
    }
}

impl fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream")
            .field("id", &self.id)
            .field("ended", &self.ended.get())
            .field("emitted", &self.emitted.get())
            .field("pipe", &*self.pipe.borrow())
            .finish()
    }
}

/// Iterator over a stream's remaining items
#[derive(Debug)]
pub struct Items<'a> {
    stream: &'a ObjectStream,
}

impl Iterator for Items<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.read().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use crate::source::readable_stream_from;
    use reshape_engine::FieldMapEntry;
    use serde_json::json;

    fn options() -> TransformOptions {
        TransformOptions::builder("root")
            .field_maps(vec![FieldMapEntry::new("a", "b", "root")])
            .build()
            .unwrap()
    }

    #[test]
    fn read_transforms_in_source_order() {
        let stream = ObjectStream::new(
            readable_stream_from(vec![json!({"a": 1}), json!({"a": 2})]),
            options(),
        );

        assert_eq!(stream.read().unwrap(), Some(json!({"b": 1})));
        assert_eq!(stream.read().unwrap(), Some(json!({"b": 2})));
        assert_eq!(stream.read().unwrap(), None);
        assert!(stream.is_ended());
        assert_eq!(stream.emitted(), 2);
    }

    #[test]
    fn data_and_end_fire_once_per_item_and_once_overall() {
        let stream = ObjectStream::new(readable_stream_from(vec![json!({"a": 1})]), options());
        let data = Rc::new(RefCell::new(Vec::new()));
        let ends = Rc::new(Cell::new(0));

        let sink = Rc::clone(&data);
        stream.on(Hook::data(move |item| sink.borrow_mut().push(item.clone())));
        let counter = Rc::clone(&ends);
        stream.on(Hook::end(move || counter.set(counter.get() + 1)));

        let items: Vec<Value> = stream.iter().collect::<Result<_>>().unwrap();
        assert_eq!(items, vec![json!({"b": 1})]);
        assert_eq!(stream.read().unwrap(), None);

        assert_eq!(*data.borrow(), vec![json!({"b": 1})]);
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn null_item_terminates_without_consuming_rest() {
        let stream = ObjectStream::new(
            readable_stream_from(vec![json!({"a": 1}), Value::Null, json!({"a": 3})]),
            options(),
        );

        let items: Vec<Value> = stream.iter().collect::<Result<_>>().unwrap();
        assert_eq!(items, vec![json!({"b": 1})]);
        assert!(stream.is_ended());
    }

    #[test]
    fn non_object_items_become_empty_objects() {
        let stream = ObjectStream::new(readable_stream_from(vec![json!(7)]), options());
        assert_eq!(stream.read().unwrap(), Some(json!({})));
    }

    struct Failing(bool);

    impl PullSource for Failing {
        fn read(&mut self) -> Result<Option<Value>> {
            if std::mem::replace(&mut self.0, false) {
                Err(StreamError::Io(std::io::Error::other("boom")))
            } else {
                Ok(None)
            }
        }
    }

    #[test]
    fn source_errors_propagate_without_ending() {
        let stream = ObjectStream::new(Failing(true), options());
        assert!(matches!(stream.read(), Err(StreamError::Io(_))));
        assert!(!stream.is_ended());
        assert_eq!(stream.read().unwrap(), None);
        assert!(stream.is_ended());
    }

    #[test]
    fn streams_have_distinct_ids() {
        let a = ObjectStream::new(readable_stream_from(Vec::new()), options());
        let b = ObjectStream::new(readable_stream_from(Vec::new()), options());
        assert_ne!(a.id(), b.id());
    }
}
