//! Byte sinks and the factories that open them.
//!
//! Both backends are opendal operators driven through `opendal::blocking`.
//! The blocking operator needs a tokio handle; a single process-wide runtime
//! provides it. Sinks must not be used from inside an async task.

use std::collections::BTreeSet;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;
use opendal::blocking;

use crate::config::{RuntimeConfig, StorageBackend};

use super::error::{Result, WriterError};

static RUNTIME: OnceCell<tokio::runtime::Runtime> = OnceCell::new();

const SINK_BUFFER: usize = 256 * 1024;

/// Destination byte stream.
pub trait ByteSink: Write + Send {
    /// Flush and release the stream, completing any trailer the stream owes.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Turns a logical destination path into a byte sink.
///
/// Creating a path that already exists truncates it, so a retried partition
/// starts its destinations from scratch.
pub trait SinkFactory: Send + Sync {
    fn create(&self, path: &str) -> io::Result<Box<dyn ByteSink>>;
}

/// Build the sink factory selected by the runtime configuration.
pub fn initialize_storage(config: &RuntimeConfig) -> Result<Arc<dyn SinkFactory>> {
    let factory: Arc<dyn SinkFactory> = match config.storage.backend {
        StorageBackend::Fs => {
            if config.storage.path.is_empty() {
                return Err(WriterError::invalid_config(
                    "storage.path required for filesystem backend".to_string(),
                ));
            }
            tracing::debug!("Using filesystem storage at: {}", config.storage.path);
            Arc::new(FsSinkFactory::new(&config.storage.path)?)
        }
        StorageBackend::Memory => {
            tracing::debug!("Using in-memory storage");
            Arc::new(MemorySinkFactory::new()?)
        }
    };
    Ok(factory)
}

/// Wrap an async operator for use from plain threads.
fn blocking_operator(label: &str, operator: opendal::Operator) -> Result<blocking::Operator> {
    let runtime = RUNTIME
        .get_or_try_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("vcfshard-io")
                .enable_all()
                .build()
        })
        .map_err(|e| WriterError::sink_io(label, "starting the storage runtime", e))?;

    let _guard = runtime.enter();
    blocking::Operator::new(operator)
        .map_err(|e| WriterError::sink_io(label, "opening storage", io::Error::other(e)))
}

fn create_sink(operator: &blocking::Operator, path: &str) -> io::Result<Box<dyn ByteSink>> {
    let writer = operator.writer(path).map_err(io::Error::other)?;
    Ok(Box::new(ObjectSink(BufWriter::with_capacity(
        SINK_BUFFER,
        ObjectWriter(writer),
    ))))
}

/// Files under a root directory.
#[derive(Clone)]
pub struct FsSinkFactory {
    root: PathBuf,
    operator: blocking::Operator,
}

impl FsSinkFactory {
    /// Factory rooted at `root`. Parent directories of each destination are
    /// created on demand.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let label = root.to_string_lossy().to_string();
        let builder = opendal::services::Fs::default().root(&label);
        let operator = opendal::Operator::new(builder)
            .map_err(|e| {
                WriterError::sink_io(&label, "creating filesystem operator", io::Error::other(e))
            })?
            .finish();
        Ok(Self {
            operator: blocking_operator(&label, operator)?,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SinkFactory for FsSinkFactory {
    fn create(&self, path: &str) -> io::Result<Box<dyn ByteSink>> {
        create_sink(&self.operator, path)
    }
}

impl std::fmt::Debug for FsSinkFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsSinkFactory")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// In-process object store. An object becomes readable once its sink is
/// finished.
#[derive(Clone)]
pub struct MemorySinkFactory {
    operator: blocking::Operator,
    created: Arc<Mutex<BTreeSet<String>>>,
}

impl MemorySinkFactory {
    pub fn new() -> Result<Self> {
        let operator = opendal::Operator::new(opendal::services::Memory::default())
            .map_err(|e| {
                WriterError::sink_io("memory", "creating memory operator", io::Error::other(e))
            })?
            .finish();
        Ok(Self {
            operator: blocking_operator("memory", operator)?,
            created: Arc::default(),
        })
    }

    /// Contents of the object at `path`, if it was finished.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.operator.read(path).ok().map(|buf| buf.to_vec())
    }

    /// All created paths, sorted, whether or not they were finished.
    pub fn paths(&self) -> Vec<String> {
        let created = self.created.lock().unwrap_or_else(|e| e.into_inner());
        created.iter().cloned().collect()
    }
}

impl SinkFactory for MemorySinkFactory {
    fn create(&self, path: &str) -> io::Result<Box<dyn ByteSink>> {
        let sink = create_sink(&self.operator, path)?;
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string());
        Ok(sink)
    }
}

impl std::fmt::Debug for MemorySinkFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySinkFactory")
            .field("created", &self.paths())
            .finish_non_exhaustive()
    }
}

/// `io::Write` over an opendal blocking writer.
struct ObjectWriter(blocking::Writer);

impl Write for ObjectWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf.to_vec()).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ObjectSink(BufWriter<ObjectWriter>);

impl Write for ObjectSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl ByteSink for ObjectSink {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut writer = self.0.into_inner().map_err(|e| e.into_error())?;
        writer.0.close().map_err(io::Error::other)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_create_truncates() {
        let factory = MemorySinkFactory::new().unwrap();
        let mut sink = factory.create("s1/part-00000").unwrap();
        sink.write_all(b"first attempt").unwrap();
        sink.finish().unwrap();
        assert_eq!(factory.read("s1/part-00000").unwrap(), b"first attempt");

        let mut sink = factory.create("s1/part-00000").unwrap();
        sink.write_all(b"retry").unwrap();
        sink.finish().unwrap();
        assert_eq!(factory.read("s1/part-00000").unwrap(), b"retry");
        assert_eq!(factory.paths(), vec!["s1/part-00000".to_string()]);
    }

    #[test]
    fn test_memory_object_visible_after_finish() {
        let factory = MemorySinkFactory::new().unwrap();
        let mut sink = factory.create("s1/part-00000").unwrap();
        sink.write_all(b"row\n").unwrap();
        assert!(factory.read("s1/part-00000").is_none());

        sink.finish().unwrap();
        assert_eq!(factory.read("s1/part-00000").unwrap(), b"row\n");
    }

    #[test]
    fn test_fs_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FsSinkFactory::new(dir.path()).unwrap();
        let mut sink = factory.create("sample1/part-00000").unwrap();
        sink.write_all(b"row\n").unwrap();
        sink.finish().unwrap();

        let written = std::fs::read(dir.path().join("sample1").join("part-00000")).unwrap();
        assert_eq!(written, b"row\n");
    }

    #[test]
    fn test_fs_create_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FsSinkFactory::new(dir.path()).unwrap();
        for body in [&b"a longer first attempt\n"[..], &b"retry\n"[..]] {
            let mut sink = factory.create("sample1/part-00000").unwrap();
            sink.write_all(body).unwrap();
            sink.finish().unwrap();
        }

        let written = std::fs::read(dir.path().join("sample1").join("part-00000")).unwrap();
        assert_eq!(written, b"retry\n");
    }

    #[test]
    fn test_initialize_storage_requires_path() {
        let mut config = RuntimeConfig::default();
        config.storage.path = String::new();
        assert!(initialize_storage(&config).is_err());

        config.storage.backend = StorageBackend::Memory;
        assert!(initialize_storage(&config).is_ok());
    }
}
