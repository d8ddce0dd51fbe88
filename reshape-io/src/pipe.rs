//! Sink adapter: binds an [`ObjectStream`] to a push sink
//!
//! The binding is a small state machine:
//!
//! ```text
//! Unbound --pipe--> Bound --unpipe/close/finish/error/end--> TearingDown --> TornDown
//!                     ^                                                         |
//!                     +-------------------------- pipe ------------------------+
//! ```
//!
//! Only one destination may be bound at a time. Every teardown path funnels
//! through [`ObjectStream::unpipe`], and the cleanup that removes the
//! cross-registered listeners runs at most once per binding.

use crate::error::{Result, StreamError};
use crate::sink::{ListenerId, PushSink, SinkEvent, SinkEventKind, UnpipeInfo};
use crate::stream::ObjectStream;
use reshape_engine::{Hook, HookId};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Listeners registered for one binding, in both directions
pub(crate) struct Binding {
    sink: Rc<dyn PushSink>,
    hub_hooks: Vec<HookId>,
    sink_listeners: Vec<ListenerId>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("hub_hooks", &self.hub_hooks.len())
            .field("sink_listeners", &self.sink_listeners.len())
            .finish()
    }
}

#[derive(Debug)]
pub(crate) enum PipeState {
    Unbound,
    Bound(Binding),
    TearingDown(Binding),
    TornDown,
}

/// Observable binding state of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeStatus {
    /// Never piped
    Unbound,
    /// A destination is attached
    Bound,
    /// Teardown in progress
    TearingDown,
    /// The last destination was detached
    TornDown,
}

impl ObjectStream {
    /// Bind `sink` as this stream's destination and start pumping.
    ///
    /// Every transformed item is written to the sink; when the source is
    /// exhausted the sink is ended. Pumping pauses while the sink refuses
    /// writes and resumes on its `drain` signal. Returns the sink for chaining.
    ///
    /// Fails with [`StreamError::DestinationAlreadyBound`] if a destination is
    /// still bound.
    pub fn pipe<S>(self: &Rc<Self>, sink: Rc<S>) -> Result<Rc<S>>
    where
        S: PushSink + 'static,
    {
        if matches!(
            *self.pipe.borrow(),
            PipeState::Bound(_) | PipeState::TearingDown(_)
        ) {
            return Err(StreamError::DestinationAlreadyBound { stream: self.id() });
        }

        let dest: Rc<dyn PushSink> = sink.clone();
        let hub_hooks = self.register_stream_side(&dest);
        let sink_listeners = self.register_sink_side(&dest);

        *self.pipe.borrow_mut() = PipeState::Bound(Binding {
            sink: Rc::clone(&dest),
            hub_hooks,
            sink_listeners,
        });
        self.paused.set(false);

        debug!(stream = %self.id(), "piped to destination");
        dest.events().emit(&SinkEvent::Pipe(self.id()));

        if self.is_ended() {
            dest.end();
            self.unpipe();
        } else {
            self.pump();
        }

        Ok(sink)
    }

    /// Detach the current destination. A no-op when nothing is bound.
    pub fn unpipe(&self) {
        let binding = match self.take_state() {
            PipeState::Bound(binding) => binding,
            other => {
                *self.pipe.borrow_mut() = other;
                return;
            }
        };

        let sink = Rc::clone(&binding.sink);
        *self.pipe.borrow_mut() = PipeState::TearingDown(binding);

        let info = UnpipeInfo::new();
        sink.events()
            .emit(&SinkEvent::Unpipe(self.id(), Rc::clone(&info)));

        // The sink-side listener normally claims the signal; this covers a
        // sink whose listeners were cleared externally.
        if info.claim() {
            self.cleanup();
        }
    }

    /// Whether a destination is currently bound
    pub fn is_piped(&self) -> bool {
        matches!(*self.pipe.borrow(), PipeState::Bound(_))
    }

    /// Current binding state
    pub fn pipe_status(&self) -> PipeStatus {
        match *self.pipe.borrow() {
            PipeState::Unbound => PipeStatus::Unbound,
            PipeState::Bound(_) => PipeStatus::Bound,
            PipeState::TearingDown(_) => PipeStatus::TearingDown,
            PipeState::TornDown => PipeStatus::TornDown,
        }
    }

    fn register_stream_side(self: &Rc<Self>, dest: &Rc<dyn PushSink>) -> Vec<HookId> {
        let mut ids = Vec::with_capacity(3);

        let sink = Rc::clone(dest);
        let weak = Rc::downgrade(self);
        ids.push(self.hub().on(Hook::data(move |item| {
            // Pause first: a sink may emit `drain` from inside `write`.
            let stream = weak.upgrade();
            if let Some(stream) = &stream {
                stream.paused.set(true);
            }
            if sink.write(item) {
                if let Some(stream) = &stream {
                    stream.paused.set(false);
                }
            }
        })));

        let sink = Rc::clone(dest);
        ids.push(self.hub().on(Hook::end(move || sink.end())));

        let weak = Rc::downgrade(self);
        ids.push(self.hub().on(Hook::end(move || {
            with_stream(&weak, |stream| stream.unpipe())
        })));

        ids
    }

    fn register_sink_side(self: &Rc<Self>, dest: &Rc<dyn PushSink>) -> Vec<ListenerId> {
        let events = dest.events();
        let id = self.id();
        let mut ids = Vec::with_capacity(5);

        let weak = Rc::downgrade(self);
        ids.push(events.on(SinkEventKind::Unpipe, move |event| {
            if let SinkEvent::Unpipe(source, info) = event {
                if *source == id && info.claim() {
                    with_stream(&weak, |stream| stream.cleanup());
                }
            }
        }));

        let weak = Rc::downgrade(self);
        ids.push(events.on(SinkEventKind::Error, move |event| {
            if let SinkEvent::Error(message) = event {
                debug!(stream = %id, error = %message, "destination reported an error");
            }
            with_stream(&weak, |stream| stream.unpipe());
        }));

        let weak = Rc::downgrade(self);
        ids.push(events.once(SinkEventKind::Close, move |_| {
            with_stream(&weak, |stream| stream.unpipe())
        }));

        let weak = Rc::downgrade(self);
        ids.push(events.once(SinkEventKind::Finish, move |_| {
            with_stream(&weak, |stream| stream.unpipe())
        }));

        let weak = Rc::downgrade(self);
        ids.push(events.on(SinkEventKind::Drain, move |_| {
            with_stream(&weak, |stream| {
                stream.paused.set(false);
                stream.pump();
            })
        }));

        ids
    }

    /// Remove every cross-registered listener. Runs once per binding.
    fn cleanup(&self) {
        let binding = match self.take_state() {
            PipeState::Bound(binding) | PipeState::TearingDown(binding) => binding,
            other => {
                *self.pipe.borrow_mut() = other;
                return;
            }
        };

        for id in &binding.hub_hooks {
            self.hub().remove(*id);
        }
        let events = binding.sink.events();
        for id in &binding.sink_listeners {
            events.remove_listener(*id);
        }
        self.paused.set(false);

        debug!(stream = %self.id(), "unpiped from destination");
    }

    /// Pull items until the source ends, the sink pushes back, or the binding
    /// goes away. Re-entrant calls return immediately.
    pub(crate) fn pump(&self) {
        if self.flowing.replace(true) {
            return;
        }

        while !self.paused.get() && self.is_piped() {
            match self.read() {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(err) => {
                    warn!(stream = %self.id(), error = %err, "source failed while piping");
                    if let Some(sink) = self.bound_sink() {
                        sink.events().emit(&SinkEvent::Error(err.to_string()));
                    }
                    break;
                }
            }
        }

        self.flowing.set(false);
    }

    fn bound_sink(&self) -> Option<Rc<dyn PushSink>> {
        match &*self.pipe.borrow() {
            PipeState::Bound(binding) | PipeState::TearingDown(binding) => {
                Some(Rc::clone(&binding.sink))
            }
            _ => None,
        }
    }

    fn take_state(&self) -> PipeState {
        std::mem::replace(&mut *self.pipe.borrow_mut(), PipeState::TornDown)
    }
}

fn with_stream(weak: &Weak<ObjectStream>, f: impl FnOnce(&ObjectStream)) {
    if let Some(stream) = weak.upgrade() {
        f(&stream);
    }
}
