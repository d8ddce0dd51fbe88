//! Pull sources feeding a transform stream

use crate::error::Result;
use serde_json::Value;

/// A source that hands out one item per pull.
///
/// `Ok(None)` reports exhaustion; after that, further reads keep returning
/// `Ok(None)`.
pub trait PullSource {
    /// Draw the next item
    fn read(&mut self) -> Result<Option<Value>>;
}

impl<S: PullSource + ?Sized> PullSource for Box<S> {
    fn read(&mut self) -> Result<Option<Value>> {
        (**self).read()
    }
}

/// Source over a finite in-memory sequence
#[derive(Debug)]
pub struct IterSource<I> {
    items: I,
}

impl<I: Iterator<Item = Value>> PullSource for IterSource<I> {
    fn read(&mut self) -> Result<Option<Value>> {
        Ok(self.items.next())
    }
}

/// Create a pull source from anything iterable
pub fn readable_stream_from<I>(items: I) -> IterSource<I::IntoIter>
where
    I: IntoIterator<Item = Value>,
{
    IterSource {
        items: items.into_iter(),
    }
}
