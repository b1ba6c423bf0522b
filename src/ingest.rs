//! Streaming-job input: one `key<separator>value` record per line.
//!
//! This is the shape a mapper emits on stdout. Lines are read as raw bytes and
//! split at the first separator. The value is carried through untouched; only
//! the key, which becomes a path segment, has to be UTF-8. A line without a
//! separator carries a key and a null value and is dropped by the writer.

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use bytes::Bytes;

use crate::record::{Record, Value};
use crate::writer::PartitionOutput;

/// Parse one input line (without its line terminator).
pub fn parse_line(line: &[u8], separator: &[u8]) -> io::Result<Record> {
    let (key, value) = match find(line, separator) {
        Some(at) => (&line[..at], Some(&line[at + separator.len()..])),
        None => (line, None),
    };
    let key = std::str::from_utf8(key).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, format!("key is not UTF-8: {}", e))
    })?;
    Ok(match value {
        Some(value) => Record::new(key, Value::Bytes(Bytes::copy_from_slice(value))),
        None => Record::key_only(key),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Strip a trailing `\n` or `\r\n`.
fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Iterate the records of a line-oriented reader.
pub fn read_records<'a, R: BufRead + 'a>(
    mut reader: R,
    separator: &'a str,
) -> impl Iterator<Item = io::Result<Record>> + 'a {
    let mut buf = Vec::new();
    std::iter::from_fn(move || {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => Some(parse_line(trim_line_end(&buf), separator.as_bytes())),
            Err(e) => Some(Err(e)),
        }
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub read: u64,
    pub written: u64,
    pub skipped: u64,
}

/// Feed every record from `reader` into `output`.
///
/// The output is not closed; the caller owns its teardown.
pub fn run<R: BufRead>(reader: R, separator: &str, output: &PartitionOutput) -> Result<IngestStats> {
    let mut stats = IngestStats::default();
    for (idx, record) in read_records(reader, separator).enumerate() {
        let record = record.with_context(|| format!("Failed to read input line {}", idx + 1))?;
        stats.read += 1;
        if record.is_null() {
            stats.skipped += 1;
            continue;
        }
        output
            .write(&record)
            .with_context(|| format!("Failed to write input line {}", idx + 1))?;
        stats.written += 1;
    }
    tracing::debug!(
        read = stats.read,
        written = stats.written,
        skipped = stats.skipped,
        "Input consumed"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_bytes(record: &Record) -> &[u8] {
        record.value.as_ref().map(Value::as_bytes).unwrap_or_default()
    }

    #[test]
    fn test_parse_line_splits_at_first_separator() {
        let record = parse_line(b"sample1\tchr1\t100\t.\tA\tT", b"\t").unwrap();
        assert_eq!(record.key.as_deref(), Some("sample1"));
        assert_eq!(value_bytes(&record), b"chr1\t100\t.\tA\tT");
    }

    #[test]
    fn test_parse_line_multibyte_separator() {
        let record = parse_line(b"s1::a::b", b"::").unwrap();
        assert_eq!(record.key.as_deref(), Some("s1"));
        assert_eq!(value_bytes(&record), b"a::b");
    }

    #[test]
    fn test_parse_line_without_separator_has_null_value() {
        let record = parse_line(b"orphan", b"\t").unwrap();
        assert_eq!(record.key.as_deref(), Some("orphan"));
        assert!(record.is_null());
    }

    #[test]
    fn test_parse_line_empty_value_is_not_null() {
        let record = parse_line(b"sample1\t", b"\t").unwrap();
        assert_eq!(record.value, Some(Value::Bytes(Bytes::new())));
        assert!(!record.is_null());
    }

    #[test]
    fn test_latin1_value_passes_through() {
        let line = b"sample1\tchr1\t100\t.\tA\tT\t50\tPASS\tDESC=caf\xe9\tGT\t0/1\n";
        let records: Vec<Record> = read_records(&line[..], "\t")
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            value_bytes(&records[0]),
            b"chr1\t100\t.\tA\tT\t50\tPASS\tDESC=caf\xe9\tGT\t0/1"
        );
    }

    #[test]
    fn test_non_utf8_key_is_rejected() {
        let err = parse_line(b"sampl\xe9\trow", b"\t").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_records_strips_line_endings() {
        let input = "s1\trow1\r\ns2\trow2\ns3\trow3";
        let records: Vec<Record> = read_records(input.as_bytes(), "\t")
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(value_bytes(&records[0]), b"row1");
        assert_eq!(records[1].key.as_deref(), Some("s2"));
        assert_eq!(value_bytes(&records[2]), b"row3");
    }
}
