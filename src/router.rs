//! Destination routing: the key names a directory, the partition base name
//! names the file inside it.

use crate::writer::{Result, WriterError};

const INVALID: [char; 3] = ['/', '\\', ':'];

/// Compute `key/base_name`.
///
/// Keys are not sanitized. A key that cannot be used as a single path segment
/// is rejected with [`WriterError::MalformedKey`].
pub fn route(key: &str, base_name: &str) -> Result<String> {
    check_segment(key).map_err(|reason| WriterError::malformed_key(key, reason))?;
    check_segment(base_name).map_err(|reason| WriterError::malformed_key(base_name, reason))?;
    Ok(format!("{}/{}", key, base_name))
}

fn check_segment(segment: &str) -> std::result::Result<(), &'static str> {
    if segment.is_empty() {
        return Err("path segment is empty");
    }
    if segment == "." || segment == ".." {
        return Err("path segment must not be '.' or '..'");
    }
    if segment.chars().any(|c| INVALID.contains(&c)) {
        return Err("path segment contains a separator or ':'");
    }
    if segment.chars().any(char::is_control) {
        return Err("path segment contains a control character");
    }
    Ok(())
}
