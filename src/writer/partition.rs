//! Single-destination line writer.
//!
//! The first row written to a fresh destination is preceded by the header
//! block and a column line labelled with that row's key. Every row after that
//! is the value followed by a newline.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::header::HeaderBlock;
use crate::record::Value;

use super::error::{Result, WriterError};
use super::storage::ByteSink;

const NEWLINE: &[u8] = b"\n";

/// How a row is laid out after the header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LineFormat {
    /// `<value>\n`; the value is already a complete row.
    #[default]
    ValueOnly,
    /// `<key><separator><value>\n`
    Delimited { separator: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Unopened,
    Open,
    Closed,
    /// A sink error ended the destination.
    Failed,
}

struct Inner {
    sink: Option<Box<dyn ByteSink>>,
    bytes_written: u64,
    rows_written: u64,
    sample: Option<String>,
    failed: bool,
}

/// Owns the byte sink of one destination.
///
/// `write` and `close` share one mutex: the header check, header emission and
/// row write of a call happen under a single guard, and `close` cannot run in
/// the middle of them.
pub struct PartitionWriter {
    path: String,
    header: Arc<HeaderBlock>,
    format: LineFormat,
    inner: Mutex<Inner>,
}

impl PartitionWriter {
    pub fn new(
        path: impl Into<String>,
        sink: Box<dyn ByteSink>,
        header: Arc<HeaderBlock>,
        format: LineFormat,
    ) -> Self {
        Self {
            path: path.into(),
            header,
            format,
            inner: Mutex::new(Inner {
                sink: Some(sink),
                bytes_written: 0,
                rows_written: 0,
                sample: None,
                failed: false,
            }),
        }
    }

    /// Destination path, including any codec suffix.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Write one row. A null key or value is ignored.
    ///
    /// Any sink error fails the writer: the sink is dropped and every later
    /// `write` or `close` reports `SinkIo` without touching the stream again.
    pub fn write(&self, key: Option<&str>, value: Option<&Value>) -> Result<()> {
        let (Some(key), Some(value)) = (key, value) else {
            return Ok(());
        };

        let mut inner = self.lock();
        if inner.failed {
            return Err(self.failed_error("writing row"));
        }
        let Inner {
            sink: slot,
            bytes_written,
            rows_written,
            sample,
            failed,
        } = &mut *inner;
        let Some(sink) = slot.as_mut() else {
            return Err(WriterError::closed(&self.path));
        };

        let header = (*bytes_written == 0).then(|| self.header.render(key));
        match self.emit(sink.as_mut(), header.as_deref(), key, value) {
            Ok(len) => {
                if header.is_some() {
                    *sample = Some(key.to_string());
                    tracing::debug!(path = %self.path, sample = key, "Wrote header");
                }
                *bytes_written += len;
                *rows_written += 1;
                Ok(())
            }
            Err((action, e)) => {
                *slot = None;
                *failed = true;
                tracing::error!(path = %self.path, error = %e, "Destination failed while {}", action);
                Err(WriterError::sink_io(&self.path, action, e))
            }
        }
    }

    /// Header (when given) and row bytes for one write. Returns the number of
    /// bytes handed to the sink.
    fn emit(
        &self,
        sink: &mut dyn ByteSink,
        header: Option<&str>,
        key: &str,
        value: &Value,
    ) -> std::result::Result<u64, (&'static str, io::Error)> {
        let mut len = 0usize;
        if let Some(header) = header {
            sink.write_all(header.as_bytes())
                .map_err(|e| ("writing header", e))?;
            len += header.len();
        }
        if let LineFormat::Delimited { separator } = &self.format {
            sink.write_all(key.as_bytes())
                .and_then(|_| sink.write_all(separator.as_bytes()))
                .map_err(|e| ("writing row", e))?;
            len += key.len() + separator.len();
        }
        let body = value.as_bytes();
        sink.write_all(body)
            .and_then(|_| sink.write_all(NEWLINE))
            .map_err(|e| ("writing row", e))?;
        len += body.len() + NEWLINE.len();
        Ok(len as u64)
    }

    fn failed_error(&self, action: &'static str) -> WriterError {
        WriterError::sink_io(
            &self.path,
            action,
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                "destination failed on an earlier write",
            ),
        )
    }

    /// Flush and release the sink. Closing twice is a no-op; closing a failed
    /// writer reports the failure again.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.failed {
            return Err(self.failed_error("closing"));
        }
        let Some(sink) = inner.sink.take() else {
            return Ok(());
        };
        if let Err(e) = sink.finish() {
            inner.failed = true;
            return Err(WriterError::sink_io(&self.path, "closing", e));
        }
        tracing::debug!(
            path = %self.path,
            rows = inner.rows_written,
            bytes = inner.bytes_written,
            "Closed destination"
        );
        Ok(())
    }

    pub fn state(&self) -> WriterState {
        let inner = self.lock();
        if inner.failed {
            return WriterState::Failed;
        }
        match (&inner.sink, inner.bytes_written) {
            (None, _) => WriterState::Closed,
            (Some(_), 0) => WriterState::Unopened,
            (Some(_), _) => WriterState::Open,
        }
    }

    /// Rows written so far, excluding the header.
    pub fn rows_written(&self) -> u64 {
        self.lock().rows_written
    }

    /// Uncompressed bytes handed to the sink, header included.
    pub fn bytes_written(&self) -> u64 {
        self.lock().bytes_written
    }

    /// Sample label used in the column line, once the header is written.
    pub fn sample(&self) -> Option<String> {
        self.lock().sample.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic mid-write leaves the byte stream as it was; the counters
        // still describe what reached the sink.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for PartitionWriter {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|e| e.into_inner());
        if inner.sink.is_some() && inner.bytes_written > 0 {
            tracing::warn!(
                path = %self.path,
                rows = inner.rows_written,
                "Destination dropped without close; output is incomplete"
            );
        }
    }
}

impl std::fmt::Debug for PartitionWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionWriter")
            .field("path", &self.path)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
