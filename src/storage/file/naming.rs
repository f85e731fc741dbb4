//! Key <-> file name mapping.
//!
//! A key is percent-escaped so it is always a single, safe path component.
//! ASCII alphanumerics and `- _ ~ $ & + , ; = @` stay as they are; everything
//! else is escaped, `.` included. Because of that:
//!
//! - the last `.` of a file name always separates the extension,
//! - `.` and `..` can never be produced as a file name,
//! - the mapping is invertible, which lets the sweeper resolve a file back
//!   to the key whose lock it must take.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes that are escaped in file names.
const KEY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'@');

/// Escapes a key into the stem of its file name.
pub fn escape_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ESCAPE).to_string()
}

/// Builds the file name for an escaped key.
pub fn file_name(escaped_key: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{}.{}", escaped_key, ext),
        None => escaped_key.to_string(),
    }
}

/// Resolves a file name back to its key.
///
/// Returns `None` for names this store would never have written: a missing
/// or different extension, invalid escapes, or a non-canonical escaping of
/// a key (for example `%61` instead of `a`).
pub fn key_from_file_name(name: &str, extension: Option<&str>) -> Option<String> {
    let stem = match extension {
        Some(ext) => name.strip_suffix(ext)?.strip_suffix('.')?,
        None => name,
    };

    if stem.is_empty() {
        return None;
    }

    let key = percent_decode_str(stem).decode_utf8().ok()?.into_owned();

    if escape_key(&key) != stem {
        return None;
    }

    Some(key)
}
