//! Event hub: ordered hooks per event kind
//!
//! Two families share one registry:
//!
//! - **Lifecycle events** (`data`, `end`) call plain listeners in registration
//!   order and ignore their results.
//! - **Mutation events** (`entry`, `leaf`, `branch`, `object_name`, `fold`) run
//!   their hooks as a left-to-right chain over a single current value. A hook
//!   returning `None` leaves the current value untouched.
//!
//! Emission works on a snapshot of the registrations, so a hook may register or
//! remove hooks (including itself) while it runs. A registration removed before
//! its turn in the snapshot is skipped.

use reshape_format::TypeTag;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Event kinds understood by the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Choose the object name governing a nested recursion
    ObjectName,
    /// Rewrite a whole sequence before its elements are mapped
    Branch,
    /// Rewrite one sequence element
    Leaf,
    /// Rewrite a field value before any other processing
    Entry,
    /// Decide whether a nested result nests or flattens into its parent
    Fold,
    /// The stream finished
    End,
    /// The stream produced an item
    Data,
}

impl EventKind {
    /// Every event kind
    pub const ALL: [EventKind; 7] = [
        EventKind::ObjectName,
        EventKind::Branch,
        EventKind::Leaf,
        EventKind::Entry,
        EventKind::Fold,
        EventKind::End,
        EventKind::Data,
    ];

    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ObjectName => "object_name",
            EventKind::Branch => "branch",
            EventKind::Leaf => "leaf",
            EventKind::Entry => "entry",
            EventKind::Fold => "fold",
            EventKind::End => "end",
            EventKind::Data => "data",
        }
    }

    /// True for value-mutating chains, false for lifecycle listeners
    pub fn is_mutation(&self) -> bool {
        !matches!(self, EventKind::End | EventKind::Data)
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event kind '{}'", s))
    }
}

/// Outcome of the `fold` chain for a recursively transformed object
#[derive(Debug, Clone, PartialEq)]
pub enum Fold {
    /// Store the result under its property name
    Nest(Map<String, Value>),
    /// Merge the result's keys into the parent as siblings
    Flatten(Map<String, Value>),
}

impl Fold {
    /// Consume into the transformed object
    pub fn into_map(self) -> Map<String, Value> {
        match self {
            Fold::Nest(map) | Fold::Flatten(map) => map,
        }
    }

    /// Request flattening, keeping the object
    pub fn flatten(self) -> Self {
        Fold::Flatten(self.into_map())
    }

    /// True when flattening was requested
    pub fn is_flatten(&self) -> bool {
        matches!(self, Fold::Flatten(_))
    }
}

/// `object_name` hook: `(current name, type, value) -> child name`
pub type OnObjectName = dyn Fn(&str, &TypeTag, &Value) -> Option<String>;
/// `branch` hook: `(sequence, type) -> sequence`
pub type OnBranch = dyn Fn(&[Value], &TypeTag) -> Option<Vec<Value>>;
/// `leaf` hook: `(element, index, type) -> element`
pub type OnLeaf = dyn Fn(&Value, usize, &TypeTag) -> Option<Value>;
/// `entry` hook: `(value, field name, type) -> value`
pub type OnEntry = dyn Fn(&Value, &str, &TypeTag) -> Option<Value>;
/// `fold` hook: `(fold, property name, type) -> fold`
pub type OnFold = dyn Fn(&Fold, &str, &TypeTag) -> Option<Fold>;
/// `data` listener
pub type OnData = dyn Fn(&Value);
/// `end` listener
pub type OnEnd = dyn Fn();

/// A hook or listener tagged with the event it handles
#[derive(Clone)]
pub enum Hook {
    /// `object_name` hook
    ObjectName(Rc<OnObjectName>),
    /// `branch` hook
    Branch(Rc<OnBranch>),
    /// `leaf` hook
    Leaf(Rc<OnLeaf>),
    /// `entry` hook
    Entry(Rc<OnEntry>),
    /// `fold` hook
    Fold(Rc<OnFold>),
    /// `end` listener
    End(Rc<OnEnd>),
    /// `data` listener
    Data(Rc<OnData>),
}

impl Hook {
    /// Wrap an `object_name` hook
    pub fn object_name<F>(f: F) -> Self
    where
        F: Fn(&str, &TypeTag, &Value) -> Option<String> + 'static,
    {
        Hook::ObjectName(Rc::new(f))
    }

    /// Wrap a `branch` hook
    pub fn branch<F>(f: F) -> Self
    where
        F: Fn(&[Value], &TypeTag) -> Option<Vec<Value>> + 'static,
    {
        Hook::Branch(Rc::new(f))
    }

    /// Wrap a `leaf` hook
    pub fn leaf<F>(f: F) -> Self
    where
        F: Fn(&Value, usize, &TypeTag) -> Option<Value> + 'static,
    {
        Hook::Leaf(Rc::new(f))
    }

    /// Wrap an `entry` hook
    pub fn entry<F>(f: F) -> Self
    where
        F: Fn(&Value, &str, &TypeTag) -> Option<Value> + 'static,
    {
        Hook::Entry(Rc::new(f))
    }

    /// Wrap a `fold` hook
    pub fn fold<F>(f: F) -> Self
    where
        F: Fn(&Fold, &str, &TypeTag) -> Option<Fold> + 'static,
    {
        Hook::Fold(Rc::new(f))
    }

    /// Wrap an `end` listener
    pub fn end<F>(f: F) -> Self
    where
        F: Fn() + 'static,
    {
        Hook::End(Rc::new(f))
    }

    /// Wrap a `data` listener
    pub fn data<F>(f: F) -> Self
    where
        F: Fn(&Value) + 'static,
    {
        Hook::Data(Rc::new(f))
    }

    /// Event this hook handles
    pub fn kind(&self) -> EventKind {
        match self {
            Hook::ObjectName(_) => EventKind::ObjectName,
            Hook::Branch(_) => EventKind::Branch,
            Hook::Leaf(_) => EventKind::Leaf,
            Hook::Entry(_) => EventKind::Entry,
            Hook::Fold(_) => EventKind::Fold,
            Hook::End(_) => EventKind::End,
            Hook::Data(_) => EventKind::Data,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook({})", self.kind())
    }
}

/// Handle returned by registration, used to remove the hook again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

struct Registration {
    id: HookId,
    once: bool,
    hook: Hook,
}

/// Ordered hook registry with lifecycle and mutation emitters
#[derive(Default)]
pub struct EventHub {
    slots: RefCell<[Vec<Registration>; 7]>,
    next_id: Cell<u64>,
}

impl EventHub {
    /// Hub with no hooks
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook to its event's chain
    pub fn on(&self, hook: Hook) -> HookId {
        self.register(hook, false)
    }

    /// Append a hook that removes itself before its first invocation
    pub fn once(&self, hook: Hook) -> HookId {
        self.register(hook, true)
    }

    /// Remove a hook. Unknown ids are ignored and return `false`.
    pub fn remove(&self, id: HookId) -> bool {
        let mut slots = self.slots.borrow_mut();
        for slot in slots.iter_mut() {
            if let Some(pos) = slot.iter().position(|reg| reg.id == id) {
                slot.remove(pos);
                return true;
            }
        }
        false
    }

    /// Whether `id` is still registered
    pub fn contains(&self, id: HookId) -> bool {
        self.slots
            .borrow()
            .iter()
            .any(|slot| slot.iter().any(|reg| reg.id == id))
    }

    /// Number of hooks registered for `kind`
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.slots.borrow()[kind.slot()].len()
    }

    /// Notify `data` listeners
    pub fn emit_data(&self, item: &Value) {
        self.each(EventKind::Data, |hook| {
            if let Hook::Data(listener) = hook {
                listener(item);
            }
        });
    }

    /// Notify `end` listeners
    pub fn emit_end(&self) {
        self.each(EventKind::End, |hook| {
            if let Hook::End(listener) = hook {
                listener();
            }
        });
    }

    /// Run the `object_name` chain starting from `name`
    pub fn emit_object_name(&self, name: &str, tag: &TypeTag, value: &Value) -> String {
        let mut current = name.to_string();
        self.each(EventKind::ObjectName, |hook| {
            if let Hook::ObjectName(f) = hook {
                if let Some(next) = f(&current, tag, value) {
                    current = next;
                }
            }
        });
        current
    }

    /// Run the `branch` chain over a sequence
    pub fn emit_branch(&self, branch: Vec<Value>, tag: &TypeTag) -> Vec<Value> {
        let mut current = branch;
        self.each(EventKind::Branch, |hook| {
            if let Hook::Branch(f) = hook {
                if let Some(next) = f(&current, tag) {
                    current = next;
                }
            }
        });
        current
    }

    /// Run the `leaf` chain over one sequence element.
    ///
    /// A hook returning `None` or `Some(Value::Null)` keeps the current value.
    pub fn emit_leaf(&self, value: Value, index: usize, tag: &TypeTag) -> Value {
        let mut current = value;
        self.each(EventKind::Leaf, |hook| {
            if let Hook::Leaf(f) = hook {
                if let Some(next) = f(&current, index, tag).filter(|v| !v.is_null()) {
                    current = next;
                }
            }
        });
        current
    }

    /// Run the `entry` chain over a field value.
    ///
    /// A hook returning `None` or `Some(Value::Null)` keeps the current value.
    pub fn emit_entry(&self, value: Value, field_name: &str, tag: &TypeTag) -> Value {
        let mut current = value;
        self.each(EventKind::Entry, |hook| {
            if let Hook::Entry(f) = hook {
                if let Some(next) = f(&current, field_name, tag).filter(|v| !v.is_null()) {
                    current = next;
                }
            }
        });
        current
    }

    /// Run the `fold` chain over a transformed nested object
    pub fn emit_fold(&self, fold: Fold, property_name: &str, tag: &TypeTag) -> Fold {
        let mut current = fold;
        self.each(EventKind::Fold, |hook| {
            if let Hook::Fold(f) = hook {
                if let Some(next) = f(&current, property_name, tag) {
                    current = next;
                }
            }
        });
        current
    }

    fn register(&self, hook: Hook, once: bool) -> HookId {
        let id = HookId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let kind = hook.kind();
        self.slots.borrow_mut()[kind.slot()].push(Registration { id, once, hook });
        id
    }

    fn each<F>(&self, kind: EventKind, mut visit: F)
    where
        F: FnMut(&Hook),
    {
        let snapshot: Vec<(HookId, bool, Hook)> = {
            let slots = self.slots.borrow();
            let slot = &slots[kind.slot()];
            if slot.is_empty() {
                return;
            }
            slot.iter()
                .map(|reg| (reg.id, reg.once, reg.hook.clone()))
                .collect()
        };

        for (id, once, hook) in snapshot {
            let live = if once { self.remove(id) } else { self.contains(id) };
            if live {
                visit(&hook);
            }
        }
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind.as_str(), &self.listener_count(kind));
        }
        map.finish()
    }
}
