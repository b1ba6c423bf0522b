//! vcfshard - split keyed VCF rows into per-sample files.
//!
//! The terminal sink of a streaming or batch job: every `(key, value)` record
//! is routed to `<key>/<partition>` under the storage root, the first row of
//! each destination is preceded by the VCF header with the key as the sample
//! column, and output may be compressed.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vcfshard::{FsSinkFactory, NoProgress, OutputSettings, PartitionOutput, Record};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let output = PartitionOutput::new(
//!     "part-00000",
//!     Arc::new(FsSinkFactory::new("/data/vcf")?),
//!     OutputSettings::plain().with_compression(true, None)?,
//!     Arc::new(NoProgress),
//! );
//! output.write(&Record::new("sample1", "chr1\t100\t.\tA\tT\t50\tPASS\t.\tGT\t0/1"))?;
//! output.close()?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod header;
pub mod ingest;
mod init;
pub mod record;
pub mod router;
pub mod writer;

pub use codec::{Codec, DEFAULT_CODEC};
pub use config::RuntimeConfig;
pub use header::HeaderBlock;
pub use init::{init_output, init_tracing};
pub use record::{Record, Value};
pub use router::route;
pub use writer::{
    open_writer, ByteSink, FsSinkFactory, MemorySinkFactory, NoProgress, OutputSettings,
    OutputSummary, PartitionOutput, PartitionWriter, Progress, SinkFactory, WriterError,
};
