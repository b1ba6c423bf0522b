//! Stream acquisition: sink creation plus optional compression.

use std::sync::Arc;

use crate::codec::Codec;
use crate::config::{OutputMode, RuntimeConfig};
use crate::header::HeaderBlock;

use super::error::{Result, WriterError};
use super::partition::{LineFormat, PartitionWriter};
use super::storage::SinkFactory;

/// Job-level output options, resolved once per partition.
#[derive(Debug, Clone)]
pub struct OutputSettings {
    /// `Some` when `compress.output` is on.
    pub codec: Option<Codec>,
    pub format: LineFormat,
    pub header: Arc<HeaderBlock>,
}

impl OutputSettings {
    /// Uncompressed, value-only rows with the built-in header.
    pub fn plain() -> Self {
        Self {
            codec: None,
            format: LineFormat::ValueOnly,
            header: HeaderBlock::shared_default(),
        }
    }

    pub fn with_compression(mut self, enabled: bool, codec: Option<&str>) -> Result<Self> {
        self.codec = if enabled {
            Some(Codec::resolve(codec)?)
        } else {
            None
        };
        Ok(self)
    }

    /// Resolve codec, row format and header from the runtime configuration.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let header = match &config.header.path {
            Some(path) => Arc::new(HeaderBlock::load(path).map_err(|e| {
                WriterError::invalid_config(format!("{:#}", e))
            })?),
            None => HeaderBlock::shared_default(),
        };
        let format = match config.output.mode {
            OutputMode::Value => LineFormat::ValueOnly,
            OutputMode::Delimited => LineFormat::Delimited {
                separator: config.output.separator.clone(),
            },
        };
        Self {
            codec: None,
            format,
            header,
        }
        .with_compression(config.compress.output, config.compress.codec.as_deref())
    }
}

/// Open the sink for `destination` and wrap it in a [`PartitionWriter`].
///
/// With a codec, the codec's suffix is appended to the path and its encoder is
/// placed between the writer and the sink.
pub fn open_writer(
    factory: &dyn SinkFactory,
    destination: &str,
    settings: &OutputSettings,
) -> Result<PartitionWriter> {
    let path = match settings.codec {
        Some(codec) => format!("{}{}", destination, codec.default_extension()),
        None => destination.to_string(),
    };

    let sink = factory
        .create(&path)
        .map_err(|e| WriterError::sink_io(&path, "creating", e))?;
    let sink = match settings.codec {
        Some(codec) => codec.wrap(sink),
        None => sink,
    };

    tracing::debug!(
        path = %path,
        codec = settings.codec.map(|c| c.name()).unwrap_or("none"),
        "Opened destination"
    );

    Ok(PartitionWriter::new(
        path,
        sink,
        Arc::clone(&settings.header),
        settings.format.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;
    use crate::writer::MemorySinkFactory;

    #[test]
    fn test_plain_path_unchanged() {
        let factory = MemorySinkFactory::new().unwrap();
        let w = open_writer(&factory, "s1/part-00000", &OutputSettings::plain()).unwrap();
        assert_eq!(w.path(), "s1/part-00000");
        assert_eq!(factory.paths(), vec!["s1/part-00000".to_string()]);
    }

    #[test]
    fn test_codec_suffix_appended() {
        let factory = MemorySinkFactory::new().unwrap();
        let settings = OutputSettings::plain()
            .with_compression(true, Some("lz4"))
            .unwrap();
        let w = open_writer(&factory, "s1/part-00000", &settings).unwrap();
        assert_eq!(w.path(), "s1/part-00000.lz4");

        let settings = OutputSettings::plain().with_compression(true, None).unwrap();
        let w = open_writer(&factory, "s2/part-00000", &settings).unwrap();
        assert_eq!(w.path(), "s2/part-00000.gz");
    }

    #[test]
    fn test_unknown_codec_fails_before_sink() {
        let err = OutputSettings::plain()
            .with_compression(true, Some("brotli"))
            .unwrap_err();
        assert!(matches!(err, WriterError::UnknownCodec { .. }));

        // Disabled compression never looks at the codec name.
        let settings = OutputSettings::plain()
            .with_compression(false, Some("brotli"))
            .unwrap();
        assert!(settings.codec.is_none());
    }

    #[test]
    fn test_from_config() {
        let mut config = RuntimeConfig::default();
        config.compress.output = true;
        config.compress.codec = Some("deflate".to_string());
        config.output.mode = OutputMode::Delimited;
        config.output.separator = ",".to_string();

        let settings = OutputSettings::from_config(&config).unwrap();
        assert_eq!(settings.codec, Some(Codec::Deflate));
        assert_eq!(
            settings.format,
            LineFormat::Delimited {
                separator: ",".to_string()
            }
        );
    }

    #[test]
    fn test_custom_header_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let header_path = dir.path().join("header.vcf");
        std::fs::write(
            &header_path,
            "##fileformat=VCFv4.1\n##source=gvcf-mapper --min-qual 30\n",
        )
        .unwrap();

        let mut config = RuntimeConfig::default();
        config.header.path = Some(header_path.to_string_lossy().to_string());
        let settings = OutputSettings::from_config(&config).unwrap();

        let factory = MemorySinkFactory::new().unwrap();
        let w = open_writer(&factory, "s1/part-00000", &settings).unwrap();
        w.write(Some("s1"), Some(&Value::from("row"))).unwrap();
        w.close().unwrap();
        assert_eq!(
            String::from_utf8(factory.read("s1/part-00000").unwrap()).unwrap(),
            "##fileformat=VCFv4.1\n##source=gvcf-mapper --min-qual 30\n\
             #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\nrow\n"
        );
    }

    #[test]
    fn test_missing_header_file_is_config_error() {
        let mut config = RuntimeConfig::default();
        config.header.path = Some("/nonexistent/header.vcf".to_string());
        let err = OutputSettings::from_config(&config).unwrap_err();
        assert!(matches!(err, WriterError::InvalidConfig { .. }));
    }
}
