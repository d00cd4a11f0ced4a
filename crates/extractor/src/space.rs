//! Free space queries for the destination volume.

use std::path::Path;

/// Reports free space on the volume holding a path.
pub trait FreeSpace {
    /// Free megabytes available to the current user, or `None` when the
    /// query is not possible.
    fn free_megabytes(&self, path: &Path) -> Option<u64>;
}

/// Queries the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFreeSpace;

impl FreeSpace for SystemFreeSpace {
    fn free_megabytes(&self, path: &Path) -> Option<u64> {
        available_bytes(path).ok().map(|bytes| bytes / 1024 / 1024)
    }
}

/// Returns `true` when at least `min_mb` megabytes are known to be free.
///
/// An unknown amount of free space counts as not enough.
pub fn has_min_free_space(space: &dyn FreeSpace, path: &Path, min_mb: u64) -> bool {
    match space.free_megabytes(path) {
        Some(free) => free >= min_mb,
        None => false,
    }
}

#[cfg(unix)]
fn available_bytes(path: &Path) -> std::io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // SAFETY: c_path is a valid NUL-terminated string, stat is zeroed and
    // only read after statvfs reports success.
    unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        // Field widths differ between platforms.
        #[allow(clippy::unnecessary_cast)]
        let available = (stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64);
        Ok(available)
    }
}

#[cfg(not(unix))]
fn available_bytes(_path: &Path) -> std::io::Result<u64> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "Disk space checking is not supported on this platform",
    ))
}
