//! Newline-delimited JSON sources and sinks

use crate::error::{Result, StreamError};
use crate::sink::{PushSink, SinkEvent, SinkEvents};
use crate::source::PullSource;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{BufRead, Write};

/// Pull source reading one JSON value per line. Blank lines are skipped.
#[derive(Debug)]
pub struct NdjsonSource<R> {
    reader: R,
    line: String,
    line_number: usize,
}

impl<R: BufRead> NdjsonSource<R> {
    /// Read values from `reader`
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> PullSource for NdjsonSource<R> {
    fn read(&mut self) -> Result<Option<Value>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|source| StreamError::InvalidLine {
                    line: self.line_number,
                    source,
                });
        }
    }
}

/// Output layout of a [`NdjsonSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One compact JSON value per line
    #[default]
    Ndjson,
    /// A single JSON array
    JsonArray,
}

/// Push sink serialising items to a writer.
///
/// I/O failures are reported through the sink's `error` event; the sink stops
/// writing after the first failure. `finish` fires after a successful `end`.
pub struct NdjsonSink<W: Write> {
    writer: RefCell<Option<W>>,
    format: OutputFormat,
    written: Cell<u64>,
    failed: Cell<bool>,
    ended: Cell<bool>,
    events: SinkEvents,
}

impl<W: Write> NdjsonSink<W> {
    /// Write newline-delimited JSON to `writer`
    pub fn new(writer: W) -> Self {
        Self::with_format(writer, OutputFormat::Ndjson)
    }

    /// Write to `writer` in the given layout
    pub fn with_format(writer: W, format: OutputFormat) -> Self {
        Self {
            writer: RefCell::new(Some(writer)),
            format,
            written: Cell::new(0),
            failed: Cell::new(false),
            ended: Cell::new(false),
            events: SinkEvents::new(),
        }
    }

    /// Items written so far
    pub fn written(&self) -> u64 {
        self.written.get()
    }

    /// Whether a write failed
    pub fn has_failed(&self) -> bool {
        self.failed.get()
    }

    /// Take back the writer; later writes are ignored
    pub fn take_writer(&self) -> Option<W> {
        self.writer.borrow_mut().take()
    }

    fn write_item(&self, item: &Value) -> Result<()> {
        let mut guard = self.writer.borrow_mut();
        let Some(writer) = guard.as_mut() else {
            return Ok(());
        };

        match self.format {
            OutputFormat::Ndjson => {
                serde_json::to_writer(&mut *writer, item)?;
                writer.write_all(b"\n")?;
            }
            OutputFormat::JsonArray => {
                writer.write_all(if self.written.get() == 0 { b"[" } else { b"," })?;
                serde_json::to_writer(&mut *writer, item)?;
            }
        }
        Ok(())
    }

    fn close_out(&self) -> Result<()> {
        let mut guard = self.writer.borrow_mut();
        let Some(writer) = guard.as_mut() else {
            return Ok(());
        };

        if self.format == OutputFormat::JsonArray {
            let tail: &[u8] = if self.written.get() == 0 { b"[]\n" } else { b"]\n" };
            writer.write_all(tail)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn fail(&self, err: StreamError) {
        self.failed.set(true);
        self.events.emit(&SinkEvent::Error(err.to_string()));
    }
}

impl<W: Write> PushSink for NdjsonSink<W> {
    fn write(&self, item: &Value) -> bool {
        if self.failed.get() || self.ended.get() {
            return true;
        }
        match self.write_item(item) {
            Ok(()) => self.written.set(self.written.get() + 1),
            Err(err) => self.fail(err),
        }
        true
    }

    fn end(&self) {
        if self.ended.replace(true) || self.failed.get() {
            return;
        }
        match self.close_out() {
            Ok(()) => self.events.emit(&SinkEvent::Finish),
            Err(err) => self.fail(err),
        }
    }

    fn events(&self) -> &SinkEvents {
        &self.events
    }
}

impl<W: Write> fmt::Debug for NdjsonSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NdjsonSink")
            .field("format", &self.format)
            .field("written", &self.written.get())
            .field("failed", &self.failed.get())
            .field("ended", &self.ended.get())
            .finish()
    }
}
