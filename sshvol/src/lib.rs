//! sshvol - reference-counted sshfs volumes for volume plugins.
//!
//! A [`VolumeDriver`] turns volume names like `alice@db1#data` into sshfs
//! mounts under a root directory and counts how many clients hold each
//! mount. The remote filesystem is attached on the first Mount of a name and
//! detached on its last Unmount.
//!
//! ```no_run
//! use sshvol::{DriverOptions, VolumeDriver};
//!
//! let driver = VolumeDriver::new(DriverOptions::with_root("/var/lib/sshvol"))?;
//! let mountpoint = driver.mount("alice@db1#data")?;
//! // ... hand `mountpoint` to the client ...
//! driver.unmount("alice@db1#data")?;
//! # Ok::<(), sshvol::SshvolError>(())
//! ```
//!
//! The driver speaks no transport. A protocol shim feeds requests to
//! [`plugin::handle`] and writes the responses back.

pub mod driver;
pub mod mount;
pub mod name;
pub mod plugin;
pub mod registry;
pub mod util;

pub use driver::VolumeDriver;
pub use driver::options::{DriverArgs, DriverOptions, LoggingOptions, MountOptions};
pub use mount::{Mounter, SshfsMounter};
pub use name::RemoteSource;
pub use registry::{VolumeRegistry, VolumeState};
pub use util::init_logging;

pub use sshvol_shared::errors::{SshvolError, SshvolResult};
pub use sshvol_shared::protocol::{Capabilities, Scope, VolumeInfo};
