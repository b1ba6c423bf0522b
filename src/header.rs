//! VCF header block written ahead of the first row of every destination.
//!
//! The header is opaque metadata to the writer: a block of `##` lines followed
//! by the `#CHROM` column line, whose last column is the sample label taken
//! from the key of the first record written to the destination.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;

/// Built-in header: hg19 contigs, GATK filter/format/info declarations and the
/// reference annotation.
pub const DEFAULT_HEADER_BLOCK: &str = include_str!("../assets/default_header.vcf");

/// The nine fixed VCF columns preceding the sample column.
pub const FIXED_COLUMNS: [&str; 9] = [
    "#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT",
];

const COLUMN_SEPARATOR: &str = "\t";

static DEFAULT_HEADER: Lazy<Arc<HeaderBlock>> =
    Lazy::new(|| Arc::new(HeaderBlock(Cow::Borrowed(DEFAULT_HEADER_BLOCK))));

/// Immutable `##` metadata block, shared read-only between writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlock(Cow<'static, str>);

impl HeaderBlock {
    /// Shared handle to the built-in header.
    pub fn shared_default() -> Arc<HeaderBlock> {
        Arc::clone(&DEFAULT_HEADER)
    }

    /// Build a header from caller-supplied text.
    ///
    /// Every non-empty line must be a `##` meta line. A missing trailing
    /// newline is added so the column line always starts on its own line.
    pub fn from_text(text: impl Into<String>) -> Result<Self> {
        let mut text = text.into();
        if text.trim().is_empty() {
            bail!("header block must not be empty");
        }
        for (idx, line) in text.lines().enumerate() {
            if !line.is_empty() && !line.starts_with("##") {
                bail!(
                    "header line {} must start with '##', found: {:?}",
                    idx + 1,
                    line
                );
            }
        }
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(Self(Cow::Owned(text)))
    }

    /// Read a header block from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read header file: {}", path.display()))?;
        Self::from_text(text)
            .with_context(|| format!("Invalid header file: {}", path.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header block followed by the column line labelled with `sample`.
    pub fn render(&self, sample: &str) -> String {
        let mut out = String::with_capacity(self.0.len() + 64 + sample.len());
        out.push_str(&self.0);
        out.push_str(&column_line(sample));
        out
    }
}

impl Default for HeaderBlock {
    fn default() -> Self {
        Self(Cow::Borrowed(DEFAULT_HEADER_BLOCK))
    }
}

/// `#CHROM\tPOS\t...\tFORMAT\t<sample>\n`
pub fn column_line(sample: &str) -> String {
    let mut line = FIXED_COLUMNS.join(COLUMN_SEPARATOR);
    line.push_str(COLUMN_SEPARATOR);
    line.push_str(sample);
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_header_shape() {
        let lines: Vec<&str> = DEFAULT_HEADER_BLOCK.lines().collect();
        assert_eq!(lines.first(), Some(&"##fileformat=VCFv4.1"));
        assert!(lines.last().unwrap().starts_with("##reference="));
        assert!(lines.iter().all(|l| l.starts_with("##")));
        assert!(DEFAULT_HEADER_BLOCK.ends_with('\n'));
        assert!(lines.iter().any(|l| l.starts_with("##contig=<ID=chr1,")));
    }

    #[test]
    fn test_column_line() {
        assert_eq!(
            column_line("sample1"),
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tsample1\n"
        );
    }

    #[test]
    fn test_render_prefixes_block() {
        let header = HeaderBlock::default();
        let rendered = header.render("NA12878");
        assert!(rendered.starts_with(DEFAULT_HEADER_BLOCK));
        assert!(rendered.ends_with("FORMAT\tNA12878\n"));
        assert_eq!(rendered.lines().count(), DEFAULT_HEADER_BLOCK.lines().count() + 1);
    }

    #[test]
    fn test_shared_default_is_single_instance() {
        let a = HeaderBlock::shared_default();
        let b = HeaderBlock::shared_default();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_from_text_appends_newline() {
        let header = HeaderBlock::from_text("##fileformat=VCFv4.2").unwrap();
        assert_eq!(header.as_str(), "##fileformat=VCFv4.2\n");
    }

    #[test]
    fn test_from_text_rejects_non_meta_lines() {
        assert!(HeaderBlock::from_text("").is_err());
        assert!(HeaderBlock::from_text("##fileformat=VCFv4.1\n#CHROM\tPOS\n").is_err());
    }
}
