//! Error types for partition writer operations.

use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Key cannot be used to build a destination path
    E001MalformedKey,
    /// E002: Compression codec cannot be resolved
    E002UnknownCodec,
    /// E003: Underlying sink failed
    E003SinkIo,
    /// E004: Configuration missing or invalid
    E004InvalidConfig,
    /// E005: Writer used after close
    E005Closed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E001MalformedKey => "E001",
            Self::E002UnknownCodec => "E002",
            Self::E003SinkIo => "E003",
            Self::E004InvalidConfig => "E004",
            Self::E005Closed => "E005",
        }
    }
}

/// Errors that can occur while routing and writing records
#[derive(Debug, Error)]
pub enum WriterError {
    /// Key is not a legal path segment
    #[error("[{code}] Malformed destination key {key:?}: {reason}")]
    MalformedKey {
        code: &'static str,
        key: String,
        reason: &'static str,
    },

    /// Requested codec is not available
    #[error("[{code}] Unknown compression codec '{codec}'. Supported: {supported}")]
    UnknownCodec {
        code: &'static str,
        codec: String,
        supported: &'static str,
    },

    /// Sink creation, write, flush or close failed
    #[error("[{code}] I/O failure on '{path}' while {action}: {source}")]
    SinkIo {
        code: &'static str,
        path: String,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration provided
    #[error("[{code}] Invalid configuration: {message}")]
    InvalidConfig { code: &'static str, message: String },

    /// Write issued against a closed writer
    #[error("[{code}] Writer for '{path}' is already closed")]
    Closed { code: &'static str, path: String },
}

impl WriterError {
    pub fn malformed_key(key: &str, reason: &'static str) -> Self {
        Self::MalformedKey {
            code: ErrorCode::E001MalformedKey.as_str(),
            key: key.to_string(),
            reason,
        }
    }

    pub fn unknown_codec(codec: &str, supported: &'static str) -> Self {
        Self::UnknownCodec {
            code: ErrorCode::E002UnknownCodec.as_str(),
            codec: codec.to_string(),
            supported,
        }
    }

    pub fn sink_io(path: &str, action: &'static str, source: std::io::Error) -> Self {
        Self::SinkIo {
            code: ErrorCode::E003SinkIo.as_str(),
            path: path.to_string(),
            action,
            source,
        }
    }

    pub fn invalid_config(message: String) -> Self {
        Self::InvalidConfig {
            code: ErrorCode::E004InvalidConfig.as_str(),
            message,
        }
    }

    pub fn closed(path: &str) -> Self {
        Self::Closed {
            code: ErrorCode::E005Closed.as_str(),
            path: path.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedKey { .. } => ErrorCode::E001MalformedKey,
            Self::UnknownCodec { .. } => ErrorCode::E002UnknownCodec,
            Self::SinkIo { .. } => ErrorCode::E003SinkIo,
            Self::InvalidConfig { .. } => ErrorCode::E004InvalidConfig,
            Self::Closed { .. } => ErrorCode::E005Closed,
        }
    }
}

/// Frameworks that only understand I/O errors get one, keeping the original
/// error kind for sink failures.
impl From<WriterError> for std::io::Error {
    fn from(err: WriterError) -> Self {
        let kind = match &err {
            WriterError::SinkIo { source, .. } => source.kind(),
            WriterError::MalformedKey { .. } => std::io::ErrorKind::InvalidInput,
            WriterError::UnknownCodec { .. } | WriterError::InvalidConfig { .. } => {
                std::io::ErrorKind::InvalidInput
            }
            WriterError::Closed { .. } => std::io::ErrorKind::BrokenPipe,
        };
        std::io::Error::new(kind, err)
    }
}

/// Result type alias for WriterError
pub type Result<T> = std::result::Result<T, WriterError>;
