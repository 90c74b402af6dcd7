//! sshvol shared - code shared between the volume driver and protocol shims
//!
//! This crate contains the error taxonomy, constants and the volume-plugin
//! request/response shapes used by both the driver core (sshvol) and whatever
//! transport a shim puts in front of it.

pub mod constants;
pub mod errors;
pub mod protocol;

pub use errors::{SshvolError, SshvolResult};
pub use protocol::{
    ActivateResponse, Capabilities, Scope, VolumeInfo, VolumeRequest, VolumeResponse,
};
