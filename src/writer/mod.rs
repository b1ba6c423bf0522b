//! Key-partitioned VCF writer.
//!
//! Routes records to per-key destinations, writes the header ahead of the
//! first row of each destination, and optionally compresses the output.

// WriterError carries the destination path and the io source.
#![allow(clippy::result_large_err)]

mod error;
mod open;
mod output;
mod partition;
mod storage;

pub use error::{ErrorCode, Result, WriterError};
pub use open::{open_writer, OutputSettings};
pub use output::{NoProgress, OutputSummary, PartitionOutput, Progress};
pub use partition::{LineFormat, PartitionWriter, WriterState};
pub use storage::{initialize_storage, ByteSink, FsSinkFactory, MemorySinkFactory, SinkFactory};
