//! Clearing protection on previously extracted files.
//!
//! Archives extracted earlier may have left read-only files behind. Before an
//! LHA archive is extracted again over the same directory, the top-level
//! directory it unpacks into is made writable so the tool can replace files.

use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Finds the archive's top-level directory name in a content listing.
///
/// Takes the text before the first `/` on the first line that has one.
/// Lines whose text before the `/` is blank are passed over.
pub fn first_top_level_dir<R: BufRead>(listing: R) -> io::Result<Option<String>> {
    for line in listing.lines() {
        let line = line?;
        if let Some((head, _)) = line.split_once('/') {
            let head = head.trim();
            if !head.is_empty() {
                return Ok(Some(head.to_string()));
            }
        }
    }
    Ok(None)
}

/// Makes every file and directory under `root` readable, writable and
/// (for directories) searchable by the owner.
///
/// Entries that cannot be updated are logged and skipped. Returns the number
/// of entries whose permissions changed.
pub fn clear_protection(root: &Path) -> usize {
    let mut changed = 0;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping entry while clearing protection");
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            continue;
        }

        match unprotect(entry.path(), file_type.is_dir()) {
            Ok(true) => changed += 1,
            Ok(false) => {}
            Err(err) => debug!(path = %entry.path().display(), error = %err, "cannot clear protection"),
        }
    }

    changed
}

#[cfg(unix)]
fn unprotect(path: &Path, is_dir: bool) -> io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    let wanted = if is_dir { 0o700 } else { 0o600 };
    let mode = permissions.mode();
    if mode & wanted == wanted {
        return Ok(false);
    }

    permissions.set_mode(mode | wanted);
    fs::set_permissions(path, permissions)?;
    Ok(true)
}

#[cfg(not(unix))]
fn unprotect(path: &Path, _is_dir: bool) -> io::Result<bool> {
    let mut permissions = fs::metadata(path)?.permissions();
    if !permissions.readonly() {
        return Ok(false);
    }

    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)?;
    Ok(true)
}
