//! Mount execution (attaching and detaching remote filesystems).
//!
//! The [`Mounter`] trait is the seam between the lifecycle coordinator and
//! the tool that actually performs the mount:
//! - [`SshfsMounter`]: runs sshfs and umount as child processes
//! - test doubles: record calls without touching the system

mod sshfs;

pub use sshfs::SshfsMounter;

use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use sshvol_shared::errors::{SshvolError, SshvolResult};

use crate::driver::constants::dirs as const_dirs;
use crate::name::RemoteSource;

/// Attaches and detaches a remote filesystem at a local directory.
///
/// Both calls block until the operation finishes and never retry; a failure
/// is returned to the caller unchanged. Implementations hold no registry
/// state.
pub trait Mounter: Send + Sync {
    /// Mount `source` on `target`. `target` already exists as a directory.
    fn mount(&self, source: &RemoteSource, target: &Path) -> SshvolResult<()>;

    /// Unmount whatever is mounted on `target`.
    fn unmount(&self, target: &Path) -> SshvolResult<()>;
}

/// Make sure `path` exists and is a directory.
///
/// Creates missing directories recursively with mode 0755. An existing
/// directory is reused as-is. The path is checked with `lstat`, so a symlink
/// at the mountpoint counts as a non-directory.
///
/// # Errors
///
/// * [`SshvolError::NotADirectory`] - a non-directory already exists at `path`
/// * [`SshvolError::DirectoryCreateFailed`] - stat or creation failed
pub fn ensure_mountpoint(path: &Path) -> SshvolResult<()> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(SshvolError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(mountpoint = %path.display(), "Volume mountpoint does not exist, creating");
            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(const_dirs::MOUNTPOINT_MODE)
                .create(path)
                .map_err(|source| {
                    tracing::warn!(mountpoint = %path.display(), "Creating volume mountpoint failed: {}", source);
                    SshvolError::DirectoryCreateFailed {
                        path: path.to_path_buf(),
                        source,
                    }
                })
        }
        Err(source) => {
            tracing::warn!(
                mountpoint = %path.display(),
                "Volume mountpoint exists but stat failed: {}",
                source
            );
            Err(SshvolError::DirectoryCreateFailed {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mountpoint = temp_dir.path().join("nested").join("alice@db1#data");

        ensure_mountpoint(&mountpoint).unwrap();

        let metadata = std::fs::metadata(&mountpoint).unwrap();
        assert!(metadata.is_dir());
        // umask may clear group/other bits, never the owner's
        assert_eq!(metadata.permissions().mode() & 0o700, 0o700);
    }

    #[test]
    fn test_existing_directory_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let mountpoint = temp_dir.path().join("db1");
        std::fs::create_dir(&mountpoint).unwrap();
        std::fs::write(mountpoint.join("marker"), "keep").unwrap();

        ensure_mountpoint(&mountpoint).unwrap();

        assert!(mountpoint.join("marker").exists());
    }

    #[test]
    fn test_file_at_mountpoint_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mountpoint = temp_dir.path().join("db1");
        std::fs::write(&mountpoint, "not a dir").unwrap();

        let err = ensure_mountpoint(&mountpoint).unwrap_err();
        assert!(matches!(err, SshvolError::NotADirectory(ref p) if p == &mountpoint));
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_symlink_at_mountpoint_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("real");
        std::fs::create_dir(&target).unwrap();
        let mountpoint = temp_dir.path().join("db1");
        std::os::unix::fs::symlink(&target, &mountpoint).unwrap();

        assert!(matches!(
            ensure_mountpoint(&mountpoint),
            Err(SshvolError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_create_below_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();

        let err = ensure_mountpoint(&blocker.join("db1")).unwrap_err();
        assert!(matches!(err, SshvolError::DirectoryCreateFailed { .. }));
    }
}
