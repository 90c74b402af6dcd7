//! Reference-counted volume registry.
//!
//! Single source of truth for which mountpoints are mounted and how many
//! clients hold each one. State is in memory only.
//!
//! **Locking Strategy**:
//! - One `Mutex` guards the map and is held only for map reads/writes.
//! - A per-mountpoint [`MountpointLease`] serializes lifecycle operations on
//!   one mountpoint. It is held across the external mount/unmount call, so a
//!   slow mount of one volume never blocks operations on another.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::{Condvar, Mutex};
use sshvol_shared::errors::{SshvolError, SshvolResult};

/// One mounted volume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeState {
    /// Volume name as given by the caller.
    pub name: String,
    /// Local directory the remote filesystem is attached to.
    pub mountpoint: PathBuf,
    /// Number of clients currently holding the mount.
    pub connections: usize,
}

#[derive(Debug, Default)]
struct RegistryInner {
    volumes: HashMap<PathBuf, VolumeState>,
    /// Mountpoints with an outstanding lease.
    in_flight: HashSet<PathBuf>,
}

/// Registry of mounted volumes keyed by mountpoint.
///
/// Owned by the driver and passed explicitly; independent instances share
/// nothing, which keeps tests isolated.
#[derive(Debug, Default)]
pub struct VolumeRegistry {
    inner: Mutex<RegistryInner>,
    /// Signalled whenever a lease is released.
    released: Condvar,
}

impl VolumeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take exclusive ownership of a mountpoint's lifecycle.
    ///
    /// Blocks while another lease on the same mountpoint is outstanding.
    /// Leases on different mountpoints never wait for each other.
    pub fn lease(&self, mountpoint: &Path) -> MountpointLease<'_> {
        let mut inner = self.inner.lock();
        let mut waited = false;
        while inner.in_flight.contains(mountpoint) {
            if !waited {
                tracing::debug!(
                    mountpoint = %mountpoint.display(),
                    "Waiting for in-flight operation on mountpoint"
                );
                waited = true;
            }
            self.released.wait(&mut inner);
        }
        inner.in_flight.insert(mountpoint.to_path_buf());
        tracing::trace!(mountpoint = %mountpoint.display(), "Acquired mountpoint lease");

        MountpointLease {
            registry: self,
            mountpoint: mountpoint.to_path_buf(),
        }
    }

    /// Get a copy of the entry for `mountpoint`.
    pub fn get(&self, mountpoint: &Path) -> Option<VolumeState> {
        self.inner.lock().volumes.get(mountpoint).cloned()
    }

    /// Add a brand-new entry.
    ///
    /// # Errors
    ///
    /// Returns error if an entry for the mountpoint already exists.
    pub fn insert(&self, state: VolumeState) -> SshvolResult<()> {
        let mut inner = self.inner.lock();
        if inner.volumes.contains_key(&state.mountpoint) {
            return Err(SshvolError::Internal(format!(
                "volume already registered on {}",
                state.mountpoint.display()
            )));
        }

        tracing::debug!(
            name = %state.name,
            mountpoint = %state.mountpoint.display(),
            connections = state.connections,
            "Registering volume"
        );
        inner.volumes.insert(state.mountpoint.clone(), state);
        Ok(())
    }

    /// Increment the entry's count, or create it with a count of 1.
    ///
    /// Returns the new count.
    pub fn increment_or_insert(&self, mountpoint: &Path, name: &str) -> usize {
        let mut inner = self.inner.lock();
        let state = inner
            .volumes
            .entry(mountpoint.to_path_buf())
            .or_insert_with(|| VolumeState {
                name: name.to_string(),
                mountpoint: mountpoint.to_path_buf(),
                connections: 0,
            });
        state.connections += 1;
        tracing::trace!(
            mountpoint = %mountpoint.display(),
            connections = state.connections,
            "Incremented volume connections"
        );
        state.connections
    }

    /// Decrement the entry's count, never below zero.
    ///
    /// Returns the new count, or `None` if there is no entry. An entry that
    /// reaches zero stays in place; evicting it is the caller's decision.
    pub fn decrement(&self, mountpoint: &Path) -> Option<usize> {
        let mut inner = self.inner.lock();
        let state = inner.volumes.get_mut(mountpoint)?;
        state.connections = state.connections.saturating_sub(1);
        tracing::trace!(
            mountpoint = %mountpoint.display(),
            connections = state.connections,
            "Decremented volume connections"
        );
        Some(state.connections)
    }

    /// Remove and return the entry for `mountpoint`.
    pub fn remove(&self, mountpoint: &Path) -> Option<VolumeState> {
        let removed = self.inner.lock().volumes.remove(mountpoint);
        if let Some(state) = &removed {
            tracing::debug!(
                name = %state.name,
                mountpoint = %mountpoint.display(),
                "Unregistered volume"
            );
        }
        removed
    }

    /// Point-in-time copy of all entries, sorted by name.
    pub fn snapshot(&self) -> Vec<VolumeState> {
        let mut volumes: Vec<_> = self.inner.lock().volumes.values().cloned().collect();
        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        volumes
    }

    pub fn len(&self) -> usize {
        self.inner.lock().volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().volumes.is_empty()
    }
}

/// Exclusive claim on one mountpoint, released on drop.
#[derive(Debug)]
pub struct MountpointLease<'a> {
    registry: &'a VolumeRegistry,
    mountpoint: PathBuf,
}

impl MountpointLease<'_> {
    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }
}

impl Drop for MountpointLease<'_> {
    fn drop(&mut self) {
        let mut inner = self.registry.inner.lock();
        inner.in_flight.remove(&self.mountpoint);
        drop(inner);
        self.registry.released.notify_all();
        tracing::trace!(mountpoint = %self.mountpoint.display(), "Released mountpoint lease");
    }
}
