//! Shared constants between the driver and protocol shims
//!
//! These values must agree on both sides of the plugin boundary.

/// Volume plugin protocol constants
pub mod plugin {
    /// Unix socket the plugin daemon is expected to listen on.
    pub const SOCKET_ADDRESS: &str = "/run/docker/plugins/sshfs.sock";

    /// Interface name announced in the activation handshake.
    pub const IMPLEMENTS: &str = "VolumeDriver";

    /// Content type of every request and response body.
    pub const CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1.2+json";
}

/// Protocol endpoint paths
pub mod endpoints {
    pub const ACTIVATE: &str = "/Plugin.Activate";
    pub const CREATE: &str = "/VolumeDriver.Create";
    pub const REMOVE: &str = "/VolumeDriver.Remove";
    pub const MOUNT: &str = "/VolumeDriver.Mount";
    pub const UNMOUNT: &str = "/VolumeDriver.Unmount";
    pub const PATH: &str = "/VolumeDriver.Path";
    pub const GET: &str = "/VolumeDriver.Get";
    pub const LIST: &str = "/VolumeDriver.List";
    pub const CAPABILITIES: &str = "/VolumeDriver.Capabilities";
}

/// Volume name syntax
pub mod names {
    /// Separates the `[user@]host` part from the remote directory.
    pub const PATH_SEPARATOR: char = '#';

    /// Separates the user from the host.
    pub const USER_SEPARATOR: char = '@';

    /// Remote directory used when the name has no `#dir` part.
    pub const DEFAULT_REMOTE_PATH: &str = "/";
}
