//! Error taxonomy for volume lifecycle operations.
//!
//! Errors are grouped by where they originate:
//! - Name handling: [`SshvolError::InvalidName`]
//! - Mountpoint preparation: [`SshvolError::NotADirectory`], [`SshvolError::DirectoryCreateFailed`]
//! - External tools: [`SshvolError::MountFailed`], [`SshvolError::UnmountFailed`],
//!   [`SshvolError::Timeout`], [`SshvolError::Spawn`]
//! - Bookkeeping: [`SshvolError::NotMounted`], [`SshvolError::VolumeInUse`]
//!
//! Every variant renders as a sentence an operator can act on without
//! correlating logs; tool failures carry the captured stderr text.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type SshvolResult<T> = Result<T, SshvolError>;

#[derive(Debug, Error)]
pub enum SshvolError {
    /// The volume name is not `[user@]host` or `[user@]host#dir`.
    #[error("invalid volume name '{name}': {reason}, use [user@]host[#dir]")]
    InvalidName { name: String, reason: &'static str },

    /// Something other than a directory already sits at the mountpoint.
    #[error("{} already exists and it's not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The mountpoint could not be inspected or created.
    #[error("failed to create volume mountpoint {}: {source}", .path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The mount tool exited unsuccessfully.
    #[error(
        "failed to mount {remote} on {}: {status}{}",
        .target.display(),
        stderr_suffix(.stderr)
    )]
    MountFailed {
        remote: String,
        target: PathBuf,
        status: String,
        stderr: String,
    },

    /// The unmount tool exited unsuccessfully.
    #[error(
        "failed to unmount {}: {status}{}",
        .target.display(),
        stderr_suffix(.stderr)
    )]
    UnmountFailed {
        target: PathBuf,
        status: String,
        stderr: String,
    },

    /// No active mount is recorded for the mountpoint.
    #[error("unable to find volume mounted on {}", .0.display())]
    NotMounted(PathBuf),

    /// The volume still has clients attached.
    #[error("volume {name} is still mounted by {connections} client(s)")]
    VolumeInUse { name: String, connections: usize },

    /// An external tool did not finish in time and was killed.
    #[error("{program} did not finish within {}s and was killed", .timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    /// An external tool could not be started at all.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}
