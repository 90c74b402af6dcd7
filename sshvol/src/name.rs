//! Volume name parsing.
//!
//! A volume name encodes the sshfs target: `[user@]host` mounts the remote
//! root, `[user@]host#dir` mounts `dir`.

use std::fmt;

use sshvol_shared::constants::names;
use sshvol_shared::errors::{SshvolError, SshvolResult};

/// Remote side of an sshfs mount, rendered as `[user@]host:path`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RemoteSource {
    user: Option<String>,
    host: String,
    path: String,
}

impl RemoteSource {
    /// Parse a volume name into a remote source.
    ///
    /// # Errors
    ///
    /// Returns [`SshvolError::InvalidName`] if the name contains more than one
    /// `#`, if the `[user@]host` part is empty or has an empty user/host, or if
    /// the user or host starts with `-` (sshfs would read it as an option).
    pub fn parse(name: &str) -> SshvolResult<Self> {
        let invalid = |reason| SshvolError::InvalidName {
            name: name.to_string(),
            reason,
        };

        let mut parts = name.split(names::PATH_SEPARATOR);
        let address = parts.next().unwrap_or_default();
        let path = parts
            .next()
            .unwrap_or(names::DEFAULT_REMOTE_PATH)
            .to_string();
        if parts.next().is_some() {
            return Err(invalid("more than one '#' separator"));
        }

        let (user, host) = match address.split_once(names::USER_SEPARATOR) {
            Some((user, host)) => {
                if user.is_empty() {
                    return Err(invalid("empty user before '@'"));
                }
                if user.starts_with('-') {
                    return Err(invalid("user must not start with '-'"));
                }
                (Some(user.to_string()), host)
            }
            None => (None, address),
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        if host.starts_with('-') {
            return Err(invalid("host must not start with '-'"));
        }

        Ok(Self {
            user,
            host: host.to_string(),
            path,
        })
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Remote directory; empty means the remote user's home directory.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RemoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}:{}", self.host, self.path)
    }
}
