//! Output compression codecs.
//!
//! A codec is chosen once per destination. It decides both the filename
//! suffix and the encoder interposed between the writer and the raw sink.

use std::io;

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::writer::{ByteSink, Result, WriterError};

const SUPPORTED: &str = "gzip, deflate, lz4";

/// Codec used when compression is enabled without naming one.
pub const DEFAULT_CODEC: Codec = Codec::Gzip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// gzip member stream, `.gz`
    Gzip,
    /// zlib-wrapped deflate, `.deflate`
    Deflate,
    /// LZ4 frame format, `.lz4`
    Lz4,
}

impl Codec {
    /// Resolve a configured codec.
    ///
    /// Accepts short names, file extensions and Hadoop codec class names
    /// (`org.apache.hadoop.io.compress.GzipCodec`). `None` selects
    /// [`DEFAULT_CODEC`].
    pub fn resolve(name: Option<&str>) -> Result<Self> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(DEFAULT_CODEC);
        };
        let short = name.rsplit('.').next().unwrap_or(name);
        let short = short.strip_suffix("Codec").unwrap_or(short);
        match short.to_lowercase().as_str() {
            "gzip" | "gz" => Ok(Codec::Gzip),
            "deflate" | "zlib" | "default" => Ok(Codec::Deflate),
            "lz4" => Ok(Codec::Lz4),
            _ => Err(WriterError::unknown_codec(name, SUPPORTED)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Codec::Gzip => "gzip",
            Codec::Deflate => "deflate",
            Codec::Lz4 => "lz4",
        }
    }

    /// Canonical filename suffix, including the leading dot.
    pub fn default_extension(&self) -> &'static str {
        match self {
            Codec::Gzip => ".gz",
            Codec::Deflate => ".deflate",
            Codec::Lz4 => ".lz4",
        }
    }

    /// Interpose the compressing encoder in front of `sink`.
    pub fn wrap(&self, sink: Box<dyn ByteSink>) -> Box<dyn ByteSink> {
        match self {
            Codec::Gzip => Box::new(GzEncoder::new(sink, Compression::default())),
            Codec::Deflate => Box::new(ZlibEncoder::new(sink, Compression::default())),
            Codec::Lz4 => Box::new(lz4_flex::frame::FrameEncoder::new(sink)),
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl ByteSink for GzEncoder<Box<dyn ByteSink>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        GzEncoder::finish(*self)?.finish()
    }
}

impl ByteSink for ZlibEncoder<Box<dyn ByteSink>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        ZlibEncoder::finish(*self)?.finish()
    }
}

impl ByteSink for lz4_flex::frame::FrameEncoder<Box<dyn ByteSink>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        lz4_flex::frame::FrameEncoder::finish(*self)
            .map_err(io::Error::other)?
            .finish()
    }
}
