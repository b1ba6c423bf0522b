//! Per-partition destination registry.
//!
//! One [`PartitionOutput`] serves one partition (task attempt). It routes each
//! record to `key/<partition name>`, opens destinations on first use, and
//! closes all of them exactly once at teardown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::record::Record;
use crate::router::route;

use super::error::{Result, WriterError};
use super::open::{open_writer, OutputSettings};
use super::partition::PartitionWriter;
use super::storage::SinkFactory;

/// Liveness signal back to the scheduler.
pub trait Progress: Send + Sync {
    fn progress(&self);
}

/// Progress sink that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn progress(&self) {}
}

impl<F> Progress for F
where
    F: Fn() + Send + Sync,
{
    fn progress(&self) {
        self()
    }
}

/// Summary of a closed partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSummary {
    /// Destination paths, sorted.
    pub destinations: Vec<String>,
    pub rows: u64,
}

pub struct PartitionOutput {
    name: String,
    factory: Arc<dyn SinkFactory>,
    settings: OutputSettings,
    progress: Arc<dyn Progress>,
    registry: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    writers: HashMap<String, Arc<PartitionWriter>>,
    closed: bool,
}

impl PartitionOutput {
    /// Writer set for partition `name`.
    pub fn new(
        name: impl Into<String>,
        factory: Arc<dyn SinkFactory>,
        settings: OutputSettings,
        progress: Arc<dyn Progress>,
    ) -> Self {
        Self {
            name: name.into(),
            factory,
            settings,
            progress,
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Route and write one record. Null records are dropped before routing,
    /// so they never create a destination.
    pub fn write(&self, record: &Record) -> Result<()> {
        let Some((key, value)) = record.parts() else {
            return Ok(());
        };
        let writer = self.writer_for(key)?;
        writer.write(Some(key), Some(value))?;
        self.progress.progress();
        Ok(())
    }

    /// Writer for `key`, opening its destination on first use.
    ///
    /// Fails with `Closed` once the output has been closed, so a late record
    /// can never truncate a finished destination.
    pub fn writer_for(&self, key: &str) -> Result<Arc<PartitionWriter>> {
        let destination = route(key, &self.name)?;
        let mut registry = self.lock();
        if registry.closed {
            return Err(WriterError::closed(&destination));
        }
        if let Some(writer) = registry.writers.get(&destination) {
            return Ok(Arc::clone(writer));
        }
        let writer = Arc::new(open_writer(
            self.factory.as_ref(),
            &destination,
            &self.settings,
        )?);
        registry.writers.insert(destination, Arc::clone(&writer));
        Ok(writer)
    }

    /// Number of destinations opened and not yet closed.
    pub fn destination_count(&self) -> usize {
        self.lock().writers.len()
    }

    /// Close every destination. All destinations are attempted; the first
    /// failure is returned. A second call closes nothing and returns an
    /// empty summary.
    pub fn close(&self) -> Result<OutputSummary> {
        let writers: Vec<Arc<PartitionWriter>> = {
            let mut registry = self.lock();
            registry.closed = true;
            registry.writers.drain().map(|(_, w)| w).collect()
        };

        let mut summary = OutputSummary::default();
        let mut first_err = None;
        for writer in writers {
            if let Err(e) = writer.close() {
                tracing::error!(path = writer.path(), error = %e, "Failed to close destination");
                first_err.get_or_insert(e);
                continue;
            }
            summary.rows += writer.rows_written();
            summary.destinations.push(writer.path().to_string());
        }
        summary.destinations.sort();

        if let Some(e) = first_err {
            return Err(e);
        }
        tracing::info!(
            partition = %self.name,
            destinations = summary.destinations.len(),
            rows = summary.rows,
            "Closed partition output"
        );
        Ok(summary)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for PartitionOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionOutput")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{MemorySinkFactory, WriterError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn output(factory: &MemorySinkFactory) -> PartitionOutput {
        PartitionOutput::new(
            "part-00000",
            Arc::new(factory.clone()),
            OutputSettings::plain(),
            Arc::new(NoProgress),
        )
    }

    #[test]
    fn test_records_fan_out_by_key() {
        let factory = MemorySinkFactory::new().unwrap();
        let out = output(&factory);
        out.write(&Record::new("s1", "a")).unwrap();
        out.write(&Record::new("s2", "b")).unwrap();
        out.write(&Record::new("s1", "c")).unwrap();
        let summary = out.close().unwrap();

        assert_eq!(
            summary.destinations,
            vec!["s1/part-00000".to_string(), "s2/part-00000".to_string()]
        );
        assert_eq!(summary.rows, 3);

        let s1 = String::from_utf8(factory.read("s1/part-00000").unwrap()).unwrap();
        assert!(s1.ends_with("FORMAT\ts1\na\nc\n"));
        let s2 = String::from_utf8(factory.read("s2/part-00000").unwrap()).unwrap();
        assert!(s2.ends_with("FORMAT\ts2\nb\n"));
    }

    #[test]
    fn test_null_records_open_nothing() {
        let factory = MemorySinkFactory::new().unwrap();
        let out = output(&factory);
        out.write(&Record::key_only("s1")).unwrap();
        out.write(&Record::default()).unwrap();
        assert_eq!(out.destination_count(), 0);
        assert!(factory.paths().is_empty());
        assert_eq!(out.close().unwrap(), OutputSummary::default());
    }

    #[test]
    fn test_malformed_key_surfaces() {
        let factory = MemorySinkFactory::new().unwrap();
        let out = output(&factory);
        let err = out.write(&Record::new("../escape", "row")).unwrap_err();
        assert!(matches!(err, WriterError::MalformedKey { .. }));
        assert!(factory.paths().is_empty());
    }

    #[test]
    fn test_progress_reported_per_written_record() {
        let factory = MemorySinkFactory::new().unwrap();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let out = PartitionOutput::new(
            "part-00001",
            Arc::new(factory),
            OutputSettings::plain(),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        );
        out.write(&Record::new("s1", "a")).unwrap();
        out.write(&Record::key_only("s1")).unwrap();
        out.write(&Record::new("s1", "b")).unwrap();
        out.close().unwrap();
        assert_eq!(ticks.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_close_twice_is_empty() {
        let factory = MemorySinkFactory::new().unwrap();
        let out = output(&factory);
        out.write(&Record::new("s1", "a")).unwrap();
        assert_eq!(out.close().unwrap().rows, 1);
        assert_eq!(out.close().unwrap(), OutputSummary::default());
    }

    #[test]
    fn test_write_after_close_keeps_destination() {
        let factory = MemorySinkFactory::new().unwrap();
        let out = output(&factory);
        out.write(&Record::new("s1", "a")).unwrap();
        out.close().unwrap();

        let err = out.write(&Record::new("s1", "late")).unwrap_err();
        assert!(matches!(err, WriterError::Closed { .. }));
        let s1 = String::from_utf8(factory.read("s1/part-00000").unwrap()).unwrap();
        assert!(s1.ends_with("FORMAT\ts1\na\n"));
        assert!(out.write(&Record::key_only("s2")).is_ok());
    }
}
