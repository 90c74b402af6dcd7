//! Volume plugin request dispatch.
//!
//! Maps protocol endpoints onto [`VolumeDriver`] calls and turns results into
//! protocol responses. Transport agnostic: a shim hands over the endpoint
//! path and the raw JSON body it received and writes back the serialized
//! response.

use serde::Serialize;
use sshvol_shared::errors::{SshvolError, SshvolResult};
use sshvol_shared::protocol::{ActivateResponse, VolumeRequest, VolumeResponse};

use crate::driver::VolumeDriver;
use crate::driver::constants::endpoints;

/// Reply for any endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PluginResponse {
    Activate(ActivateResponse),
    Volume(VolumeResponse),
}

impl PluginResponse {
    /// The volume response, if this is not an activation reply.
    pub fn as_volume(&self) -> Option<&VolumeResponse> {
        match self {
            PluginResponse::Volume(resp) => Some(resp),
            PluginResponse::Activate(_) => None,
        }
    }

    pub fn is_err(&self) -> bool {
        self.as_volume().is_some_and(VolumeResponse::is_err)
    }

    pub fn to_json(&self) -> SshvolResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| SshvolError::Internal(format!("failed to encode response: {}", e)))
    }
}

impl From<VolumeResponse> for PluginResponse {
    fn from(resp: VolumeResponse) -> Self {
        PluginResponse::Volume(resp)
    }
}

/// Handle one plugin call.
///
/// Never fails: malformed bodies, unknown endpoints and driver errors all
/// come back as a response with `Err` set.
pub fn handle(driver: &VolumeDriver, endpoint: &str, body: &[u8]) -> PluginResponse {
    tracing::debug!(endpoint, "Handling plugin request");

    let response = match endpoint {
        endpoints::ACTIVATE => return PluginResponse::Activate(ActivateResponse::default()),
        endpoints::LIST => VolumeResponse::with_volumes(driver.list()),
        endpoints::CAPABILITIES => VolumeResponse::with_capabilities(driver.capabilities()),
        endpoints::CREATE
        | endpoints::REMOVE
        | endpoints::MOUNT
        | endpoints::UNMOUNT
        | endpoints::PATH
        | endpoints::GET => match parse_request(body) {
            Ok(request) => dispatch_named(driver, endpoint, &request.name),
            Err(e) => VolumeResponse::error(e),
        },
        other => {
            tracing::warn!(endpoint = other, "Unknown plugin endpoint");
            VolumeResponse::error(format!("unknown endpoint {}", other))
        }
    };

    if response.is_err() {
        tracing::warn!(endpoint, err = %response.err, "Plugin request failed");
    }
    response.into()
}

fn parse_request(body: &[u8]) -> SshvolResult<VolumeRequest> {
    let request: VolumeRequest = serde_json::from_slice(body)
        .map_err(|e| SshvolError::Internal(format!("malformed request body: {}", e)))?;
    if request.name.is_empty() {
        return Err(SshvolError::Internal("request is missing a volume name".into()));
    }
    Ok(request)
}

fn dispatch_named(driver: &VolumeDriver, endpoint: &str, name: &str) -> VolumeResponse {
    let result = match endpoint {
        endpoints::CREATE => driver.create(name).map(|_| VolumeResponse::ok()),
        endpoints::REMOVE => driver.remove(name).map(|_| VolumeResponse::ok()),
        endpoints::MOUNT => driver.mount(name).map(VolumeResponse::with_mountpoint),
        endpoints::UNMOUNT => driver.unmount(name).map(|_| VolumeResponse::ok()),
        endpoints::PATH => Ok(VolumeResponse::with_mountpoint(driver.path(name))),
        endpoints::GET => driver.get(name).map(VolumeResponse::with_volume),
        other => Err(SshvolError::Internal(format!(
            "endpoint {} does not take a volume name",
            other
        ))),
    };
    result.unwrap_or_else(VolumeResponse::error)
}
