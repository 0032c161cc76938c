use std::ffi::CString;
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ChannelError, Result};

/// A named FIFO created by this process.
///
/// The FIFO is removed when the value is dropped, but only if the path still
/// refers to the FIFO that was created here. Removal failures are logged and
/// never propagated, so teardown always completes.
#[derive(Debug)]
pub struct Fifo {
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl Fifo {
    /// Default permission mode for created FIFOs.
    pub const DEFAULT_MODE: u32 = 0o600;

    /// Create a fresh FIFO at `path`.
    ///
    /// Any stale object at `path` is removed first. The permission bits are
    /// applied after creation so the result does not depend on the umask.
    pub fn create(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        match std::fs::remove_file(&path) {
            Ok(()) => debug!(?path, "removed stale fifo path"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(ChannelError::Create { path, source }),
        }

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| ChannelError::InvalidPath { path: path.clone() })?;

        // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), mode as libc::mode_t) };
        if rc != 0 {
            return Err(ChannelError::Create {
                path,
                source: std::io::Error::last_os_error(),
            });
        }

        // From here on the guard owns the path and removes it on early return.
        let mut fifo = Self {
            path,
            created_inode: None,
        };

        let metadata =
            std::fs::symlink_metadata(&fifo.path).map_err(|source| ChannelError::Create {
                path: fifo.path.clone(),
                source,
            })?;
        fifo.created_inode = Some((metadata.dev(), metadata.ino()));

        std::fs::set_permissions(&fifo.path, std::fs::Permissions::from_mode(mode)).map_err(
            |source| ChannelError::Create {
                path: fifo.path.clone(),
                source,
            },
        )?;

        debug!(path = ?fifo.path, mode = format_args!("{mode:o}"), "created fifo");
        Ok(fifo)
    }

    /// The path of this FIFO.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_ours(&self, metadata: &std::fs::Metadata) -> bool {
        if !metadata.file_type().is_fifo() {
            return false;
        }
        match self.created_inode {
            Some((dev, ino)) => metadata.dev() == dev && metadata.ino() == ino,
            None => true,
        }
    }
}

impl Drop for Fifo {
    fn drop(&mut self) {
        let metadata = match std::fs::symlink_metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = ?self.path, %err, "fifo path missing at teardown");
                return;
            }
        };

        if !self.is_ours(&metadata) {
            debug!(path = ?self.path, "fifo path identity changed; skipping cleanup");
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "removed fifo"),
            Err(err) => warn!(path = ?self.path, %err, "failed to remove fifo"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("evinject-fifo-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn create_and_drop_removes_path() {
        let dir = test_dir("lifecycle");
        let path = dir.join("events.fifo");

        let fifo = Fifo::create(&path, Fifo::DEFAULT_MODE).unwrap();
        let metadata = std::fs::symlink_metadata(&path).unwrap();
        assert!(metadata.file_type().is_fifo());
        assert_eq!(fifo.path(), path.as_path());

        drop(fifo);
        assert!(!path.exists(), "fifo should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn applies_mode_regardless_of_umask() {
        let dir = test_dir("mode");
        let path = dir.join("mode.fifo");

        let fifo = Fifo::create(&path, 0o640).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);

        drop(fifo);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn replaces_stale_regular_file() {
        let dir = test_dir("stale");
        let path = dir.join("stale.fifo");
        std::fs::write(&path, b"left over from a previous run").unwrap();

        let fifo = Fifo::create(&path, Fifo::DEFAULT_MODE).unwrap();
        assert!(std::fs::symlink_metadata(&path)
            .unwrap()
            .file_type()
            .is_fifo());

        drop(fifo);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn replaces_stale_fifo() {
        let dir = test_dir("stale-fifo");
        let path = dir.join("again.fifo");

        let first = Fifo::create(&path, Fifo::DEFAULT_MODE).unwrap();
        let second = Fifo::create(&path, Fifo::DEFAULT_MODE).unwrap();

        // The first guard no longer owns the path and must leave it alone.
        drop(first);
        assert!(path.exists());

        drop(second);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn drop_does_not_remove_replaced_path() {
        let dir = test_dir("replaced");
        let path = dir.join("replaced.fifo");

        let fifo = Fifo::create(&path, Fifo::DEFAULT_MODE).unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"replacement").unwrap();

        drop(fifo);
        assert!(
            path.exists(),
            "drop must not remove a path whose identity changed"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn create_fails_in_missing_directory() {
        let path = std::env::temp_dir()
            .join(format!("evinject-missing-{}", std::process::id()))
            .join("nested")
            .join("events.fifo");

        let result = Fifo::create(&path, Fifo::DEFAULT_MODE);
        assert!(matches!(result, Err(ChannelError::Create { .. })));
    }
}
