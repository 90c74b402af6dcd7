//! Volume plugin wire types.
//!
//! JSON shapes exchanged over the volume-plugin protocol. Field names follow
//! the protocol's PascalCase convention; empty fields are omitted on the wire.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::plugin;

/// Request body shared by every `/VolumeDriver.*` endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeRequest {
    #[serde(default)]
    pub name: String,

    /// Driver options from `docker volume create -o`. Unused by this driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opts: Option<HashMap<String, String>>,

    /// Caller identifier sent with Mount/Unmount.
    #[serde(default, rename = "ID", skip_serializing_if = "String::is_empty")]
    pub id: String,
}

/// A volume as reported by Get and List.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeInfo {
    pub name: String,
    pub mountpoint: PathBuf,
}

/// Whether a mountpoint means the same thing on every host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The remote target is reachable from any host, so the volume is cluster-wide.
    #[default]
    Global,
    /// The volume only exists on this host.
    Local,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Local => f.write_str("local"),
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(Scope::Global),
            "local" => Ok(Scope::Local),
            other => Err(format!(
                "invalid scope '{}': expected 'global' or 'local'",
                other
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capabilities {
    pub scope: Scope,
}

/// Response body shared by every `/VolumeDriver.*` endpoint.
///
/// A non-empty `err` marks the call as failed; the other fields are then
/// left empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mountpoint: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub err: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<VolumeInfo>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
}

impl VolumeResponse {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(err: impl fmt::Display) -> Self {
        Self {
            err: err.to_string(),
            ..Default::default()
        }
    }

    pub fn with_mountpoint(mountpoint: PathBuf) -> Self {
        Self {
            mountpoint: Some(mountpoint),
            ..Default::default()
        }
    }

    pub fn with_volume(volume: VolumeInfo) -> Self {
        Self {
            volume: Some(volume),
            ..Default::default()
        }
    }

    pub fn with_volumes(volumes: Vec<VolumeInfo>) -> Self {
        Self {
            volumes: Some(volumes),
            ..Default::default()
        }
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities: Some(capabilities),
            ..Default::default()
        }
    }

    pub fn is_err(&self) -> bool {
        !self.err.is_empty()
    }
}

/// Handshake reply for `/Plugin.Activate`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivateResponse {
    pub implements: Vec<String>,
}

impl Default for ActivateResponse {
    fn default() -> Self {
        Self {
            implements: vec![plugin::IMPLEMENTS.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_accepts_null_opts() {
        let req: VolumeRequest =
            serde_json::from_value(json!({"Name": "alice@db1#data", "Opts": null})).unwrap();
        assert_eq!(req.name, "alice@db1#data");
        assert!(req.opts.is_none());
    }

    #[test]
    fn test_request_with_id() {
        let req: VolumeRequest =
            serde_json::from_value(json!({"Name": "db1", "ID": "c0ffee"})).unwrap();
        assert_eq!(req.id, "c0ffee");
    }

    #[test]
    fn test_mount_response_omits_empty_fields() {
        let resp = VolumeResponse::with_mountpoint(PathBuf::from("/mnt/db1"));
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"Mountpoint": "/mnt/db1"})
        );
    }

    #[test]
    fn test_error_response() {
        let resp = VolumeResponse::error("boom");
        assert!(resp.is_err());
        assert_eq!(serde_json::to_value(&resp).unwrap(), json!({"Err": "boom"}));
    }

    #[test]
    fn test_empty_list_serializes_as_array() {
        let resp = VolumeResponse::with_volumes(Vec::new());
        assert_eq!(serde_json::to_value(&resp).unwrap(), json!({"Volumes": []}));
    }

    #[test]
    fn test_capabilities_scope_lowercase() {
        let resp = VolumeResponse::with_capabilities(Capabilities {
            scope: Scope::Global,
        });
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"Capabilities": {"Scope": "global"}})
        );
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("global".parse::<Scope>().unwrap(), Scope::Global);
        assert_eq!("LOCAL".parse::<Scope>().unwrap(), Scope::Local);
        assert!("cluster".parse::<Scope>().is_err());
    }

    #[test]
    fn test_activate_response() {
        assert_eq!(
            serde_json::to_value(ActivateResponse::default()).unwrap(),
            json!({"Implements": ["VolumeDriver"]})
        );
    }
}
