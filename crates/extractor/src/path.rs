//! Path string normalization.
//!
//! Paths handed to the extraction tools are plain strings so that volume
//! style roots (`Games:WHDLoad`) survive untouched. Every path the walker
//! builds goes through [`normalize`] before it is used.

use crate::error::ExtractError;

/// Path separator used when joining path segments.
pub const SEPARATOR: char = '/';

/// Volume delimiter. Only recognized before the first separator, where a
/// separator directly after it is redundant.
pub const VOLUME_DELIMITER: char = ':';

/// Maximum length in bytes of any path built during a walk.
pub const MAX_PATH_LEN: usize = 4096;

/// Normalizes a path string.
///
/// - Runs of consecutive separators collapse into one.
/// - Separators directly following a leading volume delimiter are removed,
///   so `VOL:/sub` becomes `VOL:sub`. A `:` after the first separator is an
///   ordinary name character (`/mnt/Disk:/x` stays as it is).
/// - Everything else is kept verbatim.
///
/// The operation is idempotent. Paths longer than [`MAX_PATH_LEN`] are
/// rejected rather than truncated.
///
/// # Examples
///
/// ```
/// use whd_extractor::path::normalize;
///
/// assert_eq!(normalize("Work://Games//A").unwrap(), "Work:Games/A");
/// assert_eq!(normalize("/dst//A/").unwrap(), "/dst/A/");
/// ```
pub fn normalize(path: &str) -> Result<String, ExtractError> {
    if path.len() > MAX_PATH_LEN {
        return Err(ExtractError::PathTooLong {
            path: path.to_string(),
            len: path.len(),
            max: MAX_PATH_LEN,
        });
    }
    Ok(collapse(path))
}

/// Unbounded form of [`normalize`], used for rendered command lines.
pub(crate) fn collapse(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    let mut in_volume = true;

    while let Some(c) = chars.next() {
        out.push(c);
        let volume_end = in_volume && c == VOLUME_DELIMITER;
        if volume_end || c == SEPARATOR {
            in_volume = false;
            while chars.peek() == Some(&SEPARATOR) {
                chars.next();
            }
        }
    }

    out
}

/// Removes a single trailing separator, leaving a bare root (`/`) alone.
pub fn trim_trailing_separator(path: &str) -> &str {
    match path.strip_suffix(SEPARATOR) {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

/// Joins a child name onto a directory path and normalizes the result.
pub fn join(dir: &str, name: &str) -> Result<String, ExtractError> {
    let mut joined = String::with_capacity(dir.len() + name.len() + 1);
    joined.push_str(dir);
    joined.push(SEPARATOR);
    joined.push_str(name);
    normalize(&joined)
}

/// Returns `true` for a bare volume name such as `Work:`, which takes no
/// separator before a child name.
pub fn is_volume_root(path: &str) -> bool {
    path.ends_with(VOLUME_DELIMITER) && !path.contains(SEPARATOR)
}

/// Returns the part of `path` left after removing the `root` prefix.
///
/// If `path` does not start with `root` it is returned unchanged.
pub fn strip_root<'a>(path: &'a str, root: &str) -> &'a str {
    path.strip_prefix(root).unwrap_or(path)
}

/// Returns the directory portion of `path`, up to and including the last
/// [`SEPARATOR`]. `None` when the path has no separator.
///
/// A `\` is part of a file name, not a separator.
pub fn parent_dir(path: &str) -> Option<&str> {
    path.rfind(SEPARATOR).map(|idx| &path[..=idx])
}
