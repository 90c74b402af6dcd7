//! sshfs mount helper.
//!
//! Mounts remote directories with the sshfs FUSE client and detaches them
//! with an unmount tool (umount, or fusermount -u for unprivileged setups).

use std::path::Path;
use std::process::Command;

use sshvol_shared::errors::{SshvolError, SshvolResult};

use crate::driver::options::MountOptions;
use crate::mount::Mounter;
use crate::name::RemoteSource;
use crate::util::run_with_timeout;

/// Mounts volumes by running sshfs as a child process.
#[derive(Clone, Debug)]
pub struct SshfsMounter {
    options: MountOptions,
}

impl SshfsMounter {
    pub fn new(options: MountOptions) -> Self {
        Self { options }
    }

    /// Build `sshfs [-o opts] -- <source> <target>`.
    fn mount_command(&self, source: &RemoteSource, target: &Path) -> Command {
        let mut cmd = Command::new(&self.options.sshfs_binary);
        if !self.options.sshfs_options.is_empty() {
            cmd.arg("-o").arg(self.options.sshfs_options.join(","));
        }
        cmd.arg("--").arg(source.to_string()).arg(target);
        cmd
    }

    /// Build `umount [args] <target>`.
    fn unmount_command(&self, target: &Path) -> Command {
        let mut cmd = Command::new(&self.options.unmount_binary);
        cmd.args(&self.options.unmount_args).arg(target);
        cmd
    }
}

impl Mounter for SshfsMounter {
    fn mount(&self, source: &RemoteSource, target: &Path) -> SshvolResult<()> {
        let cmd = self.mount_command(source, target);
        tracing::info!(
            source = %source,
            target = %target.display(),
            command = ?cmd,
            "Attempting to mount"
        );

        let output = run_with_timeout(cmd, self.options.mount_timeout())?;
        if !output.success() {
            tracing::warn!(
                source = %source,
                target = %target.display(),
                status = %output.status,
                stderr = %output.stderr.trim(),
                "Mount command failed"
            );
            return Err(SshvolError::MountFailed {
                remote: source.to_string(),
                target: target.to_path_buf(),
                status: output.status.to_string(),
                stderr: output.stderr,
            });
        }

        tracing::info!(source = %source, target = %target.display(), "Mounted");
        Ok(())
    }

    fn unmount(&self, target: &Path) -> SshvolResult<()> {
        let cmd = self.unmount_command(target);
        tracing::info!(target = %target.display(), command = ?cmd, "Attempting to unmount");

        let output = run_with_timeout(cmd, self.options.unmount_timeout())?;
        if !output.success() {
            tracing::warn!(
                target = %target.display(),
                status = %output.status,
                stderr = %output.stderr.trim(),
                "Unmount command failed"
            );
            return Err(SshvolError::UnmountFailed {
                target: target.to_path_buf(),
                status: output.status.to_string(),
                stderr: output.stderr,
            });
        }

        tracing::info!(target = %target.display(), "Unmounted");
        Ok(())
    }
}
