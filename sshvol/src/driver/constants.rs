//! Constants for the sshvol driver
//!
//! Centralized location for hardcoded defaults, paths and environment names.

// Re-export shared constants from sshvol-shared
pub use sshvol_shared::constants::{endpoints, names, plugin};

pub mod envs {
    /// Overrides the volumes root directory.
    pub const SSHVOL_ROOT: &str = "SSHVOL_ROOT";

    /// Overrides the log directory.
    pub const SSHVOL_LOG_DIR: &str = "SSHVOL_LOG_DIR";
}

/// Directory layout
pub mod dirs {
    /// Default parent of all mountpoints, as used by the volume plugin helpers.
    pub const DOCKER_VOLUMES_ROOT: &str = "/var/lib/docker-volumes";

    /// Subdirectory of [`DOCKER_VOLUMES_ROOT`] owned by this driver.
    pub const DRIVER_DIR: &str = "_sshfs";

    /// Permissions for newly created mountpoints.
    pub const MOUNTPOINT_MODE: u32 = 0o755;
}

/// External tools and their defaults
pub mod tools {
    pub const SSHFS: &str = "sshfs";
    pub const UMOUNT: &str = "umount";

    /// Seconds to wait for sshfs to attach before killing it.
    pub const DEFAULT_MOUNT_TIMEOUT_SECS: u64 = 60;

    /// Seconds to wait for umount before killing it.
    pub const DEFAULT_UNMOUNT_TIMEOUT_SECS: u64 = 30;
}

pub mod logging {
    pub const DEFAULT_LEVEL: &str = "info";

    /// Rolling log files are named `<prefix>.YYYY-MM-DD`.
    pub const FILE_PREFIX: &str = "sshvol.log";
}
