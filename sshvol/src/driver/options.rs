//! Configuration for the sshvol driver.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sshvol_shared::errors::{SshvolError, SshvolResult};
use sshvol_shared::protocol::Scope;

use crate::driver::constants::{dirs as const_dirs, envs, logging as const_logging, tools};

// ============================================================================
// Driver Options
// ============================================================================

/// Top-level driver configuration, supplied once at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverOptions {
    /// Directory under which every mountpoint is created.
    ///
    /// Default: /var/lib/docker-volumes/_sshfs
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Scope reported by the Capabilities call.
    ///
    /// Default: global
    #[serde(default)]
    pub scope: Scope,

    #[serde(default)]
    pub mount: MountOptions,

    #[serde(default)]
    pub logging: LoggingOptions,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            root: default_root(),
            scope: Scope::default(),
            mount: MountOptions::default(),
            logging: LoggingOptions::default(),
        }
    }
}

impl DriverOptions {
    /// Options rooted at `root`, everything else default.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> SshvolResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SshvolError::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let options: Self = serde_json::from_str(&content).map_err(|e| {
            SshvolError::Config(format!(
                "failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Check preconditions the driver relies on.
    pub fn validate(&self) -> SshvolResult<()> {
        if !self.root.is_absolute() {
            return Err(SshvolError::Config(format!(
                "root must be an absolute path, got: {}",
                self.root.display()
            )));
        }
        if self.mount.sshfs_binary.as_os_str().is_empty() {
            return Err(SshvolError::Config("sshfs binary must not be empty".into()));
        }
        if self.mount.unmount_binary.as_os_str().is_empty() {
            return Err(SshvolError::Config(
                "unmount binary must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_root() -> PathBuf {
    Path::new(const_dirs::DOCKER_VOLUMES_ROOT).join(const_dirs::DRIVER_DIR)
}

// ============================================================================
// Mount Options
// ============================================================================

/// How the external sshfs and unmount tools are invoked.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MountOptions {
    /// Default: sshfs (resolved through PATH)
    #[serde(default = "default_sshfs_binary")]
    pub sshfs_binary: PathBuf,

    /// Passed to sshfs as a single `-o a,b,c` argument.
    ///
    /// Example: ["reconnect", "IdentityFile=/root/.ssh/id_ed25519"]
    #[serde(default)]
    pub sshfs_options: Vec<String>,

    /// Default: umount
    #[serde(default = "default_unmount_binary")]
    pub unmount_binary: PathBuf,

    /// Extra arguments placed before the target, e.g. `["-u"]` for fusermount.
    #[serde(default)]
    pub unmount_args: Vec<String>,

    /// Seconds before a hanging sshfs is killed. `None` waits forever.
    #[serde(default = "default_mount_timeout_secs")]
    pub mount_timeout_secs: Option<u64>,

    /// Seconds before a hanging unmount is killed. `None` waits forever.
    #[serde(default = "default_unmount_timeout_secs")]
    pub unmount_timeout_secs: Option<u64>,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            sshfs_binary: default_sshfs_binary(),
            sshfs_options: Vec::new(),
            unmount_binary: default_unmount_binary(),
            unmount_args: Vec::new(),
            mount_timeout_secs: default_mount_timeout_secs(),
            unmount_timeout_secs: default_unmount_timeout_secs(),
        }
    }
}

impl MountOptions {
    pub fn mount_timeout(&self) -> Option<Duration> {
        self.mount_timeout_secs.map(Duration::from_secs)
    }

    pub fn unmount_timeout(&self) -> Option<Duration> {
        self.unmount_timeout_secs.map(Duration::from_secs)
    }
}

fn default_sshfs_binary() -> PathBuf {
    PathBuf::from(tools::SSHFS)
}

fn default_unmount_binary() -> PathBuf {
    PathBuf::from(tools::UMOUNT)
}

fn default_mount_timeout_secs() -> Option<u64> {
    Some(tools::DEFAULT_MOUNT_TIMEOUT_SECS)
}

fn default_unmount_timeout_secs() -> Option<u64> {
    Some(tools::DEFAULT_UNMOUNT_TIMEOUT_SECS)
}

// ============================================================================
// Logging Options
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingOptions {
    /// Filter directives used when RUST_LOG is unset.
    ///
    /// Default: info
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write rolling log files here instead of stderr.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_log_level() -> String {
    const_logging::DEFAULT_LEVEL.to_string()
}

// ============================================================================
// Command-line Flags
// ============================================================================

/// Driver flags, meant to be `#[command(flatten)]`ed into a shim's parser.
#[derive(clap::Args, Clone, Debug)]
pub struct DriverArgs {
    /// SshFS volumes root directory
    #[arg(long, env = envs::SSHVOL_ROOT, default_value_os_t = default_root())]
    pub root: PathBuf,

    /// Volume scope reported to the engine (global or local)
    #[arg(long, default_value_t = Scope::Global)]
    pub scope: Scope,

    /// sshfs executable
    #[arg(long, default_value = tools::SSHFS)]
    pub sshfs_binary: PathBuf,

    /// sshfs mount option, may be repeated (e.g. -o reconnect)
    #[arg(short = 'o', long = "sshfs-option")]
    pub sshfs_options: Vec<String>,

    /// Unmount executable
    #[arg(long, default_value = tools::UMOUNT)]
    pub unmount_binary: PathBuf,

    /// Argument passed to the unmount executable, may be repeated (e.g. --unmount-arg -u)
    #[arg(long = "unmount-arg", allow_hyphen_values = true)]
    pub unmount_args: Vec<String>,

    /// Seconds to wait for sshfs before killing it (0 waits forever)
    #[arg(long, default_value_t = tools::DEFAULT_MOUNT_TIMEOUT_SECS)]
    pub mount_timeout: u64,

    /// Seconds to wait for unmount before killing it (0 waits forever)
    #[arg(long, default_value_t = tools::DEFAULT_UNMOUNT_TIMEOUT_SECS)]
    pub unmount_timeout: u64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = const_logging::DEFAULT_LEVEL)]
    pub log_level: String,

    /// Write logs to rolling files in this directory instead of stderr
    #[arg(long, env = envs::SSHVOL_LOG_DIR)]
    pub log_dir: Option<PathBuf>,
}

impl DriverArgs {
    pub fn into_options(self) -> DriverOptions {
        let non_zero = |secs: u64| (secs > 0).then_some(secs);
        DriverOptions {
            root: self.root,
            scope: self.scope,
            mount: MountOptions {
                sshfs_binary: self.sshfs_binary,
                sshfs_options: self.sshfs_options,
                unmount_binary: self.unmount_binary,
                unmount_args: self.unmount_args,
                mount_timeout_secs: non_zero(self.mount_timeout),
                unmount_timeout_secs: non_zero(self.unmount_timeout),
            },
            logging: LoggingOptions {
                level: self.log_level,
                log_dir: self.log_dir,
            },
        }
    }
}
