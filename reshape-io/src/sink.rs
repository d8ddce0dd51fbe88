//! Push sinks and their event emitter
//!
//! A push sink accepts items through [`PushSink::write`] and signals its own
//! lifecycle (`close`, `finish`, `error`, `drain`, `pipe`, `unpipe`) through a
//! [`SinkEvents`] emitter that other parties can listen on.

use crate::error::StreamId;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Marker carried by `unpipe` signals.
///
/// Whoever performs the teardown flips it, so a second observer of the same
/// signal does not tear down again.
#[derive(Debug, Default)]
pub struct UnpipeInfo {
    has_unpiped: Cell<bool>,
}

impl UnpipeInfo {
    /// Fresh, not-yet-unpiped marker
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Whether teardown already happened for this signal
    pub fn has_unpiped(&self) -> bool {
        self.has_unpiped.get()
    }

    /// Claim the teardown. Returns `false` if it was already claimed.
    pub fn claim(&self) -> bool {
        !self.has_unpiped.replace(true)
    }
}

/// Signal emitted by a sink
#[derive(Debug, Clone)]
pub enum SinkEvent {
    /// The sink's underlying resource closed
    Close,
    /// The sink flushed everything after `end`
    Finish,
    /// The sink failed
    Error(String),
    /// The sink can accept writes again after refusing one
    Drain,
    /// A stream was piped into the sink
    Pipe(StreamId),
    /// A stream is being unpiped from the sink
    Unpipe(StreamId, Rc<UnpipeInfo>),
}

/// Discriminant of [`SinkEvent`], used to subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkEventKind {
    /// `close`
    Close,
    /// `finish`
    Finish,
    /// `error`
    Error,
    /// `drain`
    Drain,
    /// `pipe`
    Pipe,
    /// `unpipe`
    Unpipe,
}

impl SinkEvent {
    /// Kind of this event
    pub fn kind(&self) -> SinkEventKind {
        match self {
            SinkEvent::Close => SinkEventKind::Close,
            SinkEvent::Finish => SinkEventKind::Finish,
            SinkEvent::Error(_) => SinkEventKind::Error,
            SinkEvent::Drain => SinkEventKind::Drain,
            SinkEvent::Pipe(_) => SinkEventKind::Pipe,
            SinkEvent::Unpipe(..) => SinkEventKind::Unpipe,
        }
    }
}

/// Listener for sink events
pub type SinkListener = dyn Fn(&SinkEvent);

/// Handle for removing a sink listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct SinkRegistration {
    id: ListenerId,
    kind: SinkEventKind,
    once: bool,
    listener: Rc<SinkListener>,
}

/// Ordered listener registry for one sink.
///
/// Emission iterates a snapshot; listeners removed mid-emission are skipped.
#[derive(Default)]
pub struct SinkEvents {
    listeners: RefCell<Vec<SinkRegistration>>,
    next_id: Cell<u64>,
}

impl SinkEvents {
    /// Emitter with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for every event of `kind`
    pub fn on<F>(&self, kind: SinkEventKind, listener: F) -> ListenerId
    where
        F: Fn(&SinkEvent) + 'static,
    {
        self.register(kind, false, Rc::new(listener))
    }

    /// Listen for the next event of `kind` only
    pub fn once<F>(&self, kind: SinkEventKind, listener: F) -> ListenerId
    where
        F: Fn(&SinkEvent) + 'static,
    {
        self.register(kind, true, Rc::new(listener))
    }

    /// Remove a listener. Unknown ids are ignored and return `false`.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|reg| reg.id == id) {
            Some(pos) => {
                listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of listeners for `kind`
    pub fn listener_count(&self, kind: SinkEventKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|reg| reg.kind == kind)
            .count()
    }

    /// Deliver `event` to its listeners in registration order
    pub fn emit(&self, event: &SinkEvent) {
        let kind = event.kind();
        let snapshot: Vec<(ListenerId, bool, Rc<SinkListener>)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|reg| reg.kind == kind)
            .map(|reg| (reg.id, reg.once, Rc::clone(&reg.listener)))
            .collect();

        for (id, once, listener) in snapshot {
            let live = if once {
                self.remove_listener(id)
            } else {
                self.listeners.borrow().iter().any(|reg| reg.id == id)
            };
            if live {
                listener(event);
            }
        }
    }

    fn register(&self, kind: SinkEventKind, once: bool, listener: Rc<SinkListener>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push(SinkRegistration {
            id,
            kind,
            once,
            listener,
        });
        id
    }
}

impl fmt::Debug for SinkEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkEvents")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

/// A push-based, event-driven consumer
pub trait PushSink {
    /// Accept one item. Returning `false` asks the writer to pause until the
    /// sink emits [`SinkEvent::Drain`].
    fn write(&self, item: &Value) -> bool;

    /// No more items will be written
    fn end(&self);

    /// The sink's event emitter
    fn events(&self) -> &SinkEvents;
}

/// Sink that collects items in memory.
///
/// With a high-water mark, `write` refuses further items once that many have
/// arrived since the last [`CollectSink::drain`].
#[derive(Debug, Default)]
pub struct CollectSink {
    items: RefCell<Vec<Value>>,
    pending: Cell<usize>,
    high_water_mark: Option<usize>,
    ended: Cell<bool>,
    events: SinkEvents,
}

impl CollectSink {
    /// Unbounded collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector that applies backpressure after `limit` pending writes
    pub fn with_high_water_mark(limit: usize) -> Self {
        Self {
            high_water_mark: Some(limit.max(1)),
            ..Self::default()
        }
    }

    /// Items collected so far
    pub fn items(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    /// Number of items collected
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// True when nothing was collected
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Whether `end` was called
    pub fn is_ended(&self) -> bool {
        self.ended.get()
    }

    /// Acknowledge pending writes and emit `drain`
    pub fn drain(&self) {
        self.pending.set(0);
        self.events.emit(&SinkEvent::Drain);
    }
}

impl PushSink for CollectSink {
    fn write(&self, item: &Value) -> bool {
        self.items.borrow_mut().push(item.clone());
        let pending = self.pending.get() + 1;
        self.pending.set(pending);
        self.high_water_mark.map_or(true, |limit| pending < limit)
    }

    fn end(&self) {
        if !self.ended.replace(true) {
            self.events.emit(&SinkEvent::Finish);
        }
    }

    fn events(&self) -> &SinkEvents {
        &self.events
    }
}
