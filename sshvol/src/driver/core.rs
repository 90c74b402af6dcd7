//! Volume lifecycle coordinator.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use sshvol_shared::errors::{SshvolError, SshvolResult};
use sshvol_shared::protocol::{Capabilities, VolumeInfo};

use crate::driver::options::DriverOptions;
use crate::mount::{Mounter, SshfsMounter, ensure_mountpoint};
use crate::name::RemoteSource;
use crate::registry::{VolumeRegistry, VolumeState};

/// Reference-counted sshfs volume driver.
///
/// Each mountpoint moves through
/// ```text
/// Absent → Mounting → Mounted(N) → Unmounting → Absent
/// ```
/// The external mount runs on the 0→1 transition and the external unmount
/// on 1→0; every other Mount/Unmount only adjusts the count.
///
/// **Thread Safety**: all methods take `&self` and may be called from many
/// threads at once. Operations on the same mountpoint are serialized through
/// a registry lease; operations on different mountpoints run in parallel.
pub struct VolumeDriver {
    root: PathBuf,
    capabilities: Capabilities,
    registry: VolumeRegistry,
    mounter: Arc<dyn Mounter>,
}

impl VolumeDriver {
    /// Create a driver that mounts with sshfs.
    ///
    /// # Errors
    ///
    /// Returns error if the options fail validation.
    pub fn new(options: DriverOptions) -> SshvolResult<Self> {
        let mounter = Arc::new(SshfsMounter::new(options.mount.clone()));
        Self::with_mounter(options, mounter)
    }

    /// Create a driver with a custom mount executor.
    pub fn with_mounter(options: DriverOptions, mounter: Arc<dyn Mounter>) -> SshvolResult<Self> {
        options.validate()?;

        tracing::debug!(
            root = %options.root.display(),
            scope = %options.scope,
            "initialized volume driver"
        );

        Ok(Self {
            root: options.root,
            capabilities: Capabilities {
                scope: options.scope,
            },
            registry: VolumeRegistry::new(),
            mounter,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Provisioning is deferred to the first mount, so this always succeeds.
    pub fn create(&self, name: &str) -> SshvolResult<()> {
        tracing::debug!(name, "Create volume (deferred to first mount)");
        Ok(())
    }

    /// Forget a volume.
    ///
    /// Unknown names are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SshvolError::VolumeInUse`] if the volume still has clients.
    pub fn remove(&self, name: &str) -> SshvolResult<()> {
        let mountpoint = self.path(name);
        let _lease = self.registry.lease(&mountpoint);

        match self.registry.get(&mountpoint) {
            Some(state) => {
                tracing::warn!(
                    name,
                    connections = state.connections,
                    "Refusing to remove volume that is still mounted"
                );
                Err(SshvolError::VolumeInUse {
                    name: name.to_string(),
                    connections: state.connections,
                })
            }
            None => {
                tracing::debug!(name, "Remove of unmounted volume is a no-op");
                Ok(())
            }
        }
    }

    /// Mount a volume and return its mountpoint.
    ///
    /// The first mount of a name runs the external mount; later mounts only
    /// add a reference.
    ///
    /// # Errors
    ///
    /// * [`SshvolError::InvalidName`] - malformed name, or one whose
    ///   mountpoint would not sit below the root; nothing was touched
    /// * [`SshvolError::NotADirectory`] / [`SshvolError::DirectoryCreateFailed`]
    /// * any error from the mount executor
    ///
    /// On error no entry is recorded. A directory created along the way is
    /// left in place.
    pub fn mount(&self, name: &str) -> SshvolResult<PathBuf> {
        let mountpoint = self.mountpoint_below_root(name)?;
        let _lease = self.registry.lease(&mountpoint);

        if self.registry.get(&mountpoint).is_some() {
            let connections = self.registry.increment_or_insert(&mountpoint, name);
            tracing::info!(
                name,
                mountpoint = %mountpoint.display(),
                connections,
                "Volume already mounted"
            );
            return Ok(mountpoint);
        }

        let source = RemoteSource::parse(name)?;
        ensure_mountpoint(&mountpoint)?;

        if let Err(e) = self.mounter.mount(&source, &mountpoint) {
            tracing::warn!(
                name,
                mountpoint = %mountpoint.display(),
                "Mounting volume failed: {}",
                e
            );
            return Err(e);
        }

        self.registry.insert(VolumeState {
            name: name.to_string(),
            mountpoint: mountpoint.clone(),
            connections: 1,
        })?;

        tracing::info!(name, mountpoint = %mountpoint.display(), source = %source, "Mounted volume");
        Ok(mountpoint)
    }

    /// Release one reference to a volume.
    ///
    /// The last reference runs the external unmount and drops the entry.
    ///
    /// # Errors
    ///
    /// * [`SshvolError::NotMounted`] - no mount recorded for the name
    /// * any error from the mount executor; the count is left unchanged so
    ///   the call can be retried
    pub fn unmount(&self, name: &str) -> SshvolResult<()> {
        let mountpoint = self.path(name);
        let _lease = self.registry.lease(&mountpoint);

        let state = match self.registry.get(&mountpoint) {
            Some(state) => state,
            None => {
                tracing::warn!(name, mountpoint = %mountpoint.display(), "Unmount of volume that is not mounted");
                return Err(SshvolError::NotMounted(mountpoint));
            }
        };

        if state.connections > 1 {
            let connections = self.registry.decrement(&mountpoint).unwrap_or_default();
            tracing::info!(
                name,
                mountpoint = %mountpoint.display(),
                connections,
                "Released volume reference"
            );
            return Ok(());
        }

        tracing::info!(name, mountpoint = %mountpoint.display(), "Unmounting volume");
        if let Err(e) = self.mounter.unmount(&mountpoint) {
            tracing::warn!(
                name,
                mountpoint = %mountpoint.display(),
                "Unmounting volume failed, keeping it registered: {}",
                e
            );
            return Err(e);
        }

        self.registry.decrement(&mountpoint);
        self.registry.remove(&mountpoint);
        Ok(())
    }

    /// Mountpoint for a name; pure derivation, valid whether or not mounted.
    ///
    /// Leading slashes are dropped so a name is always joined onto the root.
    /// Names that differ only in leading or trailing slashes (`db1`, `/db1`,
    /// `db1/`) therefore share one mountpoint and one registry entry, which
    /// keeps the name it was first mounted under. Mount additionally rejects
    /// names with `.` or `..` components.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }

    /// [`Self::path`] for a name about to be mounted.
    ///
    /// # Errors
    ///
    /// Returns [`SshvolError::InvalidName`] if the name has a `.` or `..`
    /// component, or no component at all.
    fn mountpoint_below_root(&self, name: &str) -> SshvolResult<PathBuf> {
        let invalid = |reason| SshvolError::InvalidName {
            name: name.to_string(),
            reason,
        };

        let mut has_component = false;
        for component in Path::new(name).components() {
            match component {
                Component::Normal(_) => has_component = true,
                Component::RootDir => {}
                Component::CurDir | Component::ParentDir | Component::Prefix(_) => {
                    return Err(invalid("'.' and '..' path components are not allowed"));
                }
            }
        }
        if !has_component {
            return Err(invalid("name does not name a mountpoint"));
        }

        Ok(self.path(name))
    }

    /// Look up a mounted volume.
    ///
    /// # Errors
    ///
    /// Returns [`SshvolError::NotMounted`] if the volume is not mounted.
    pub fn get(&self, name: &str) -> SshvolResult<VolumeInfo> {
        let mountpoint = self.path(name);
        self.registry
            .get(&mountpoint)
            .map(|state| self.volume_info(&state))
            .ok_or(SshvolError::NotMounted(mountpoint))
    }

    /// All mounted volumes, sorted by name. Empty when nothing is mounted.
    pub fn list(&self) -> Vec<VolumeInfo> {
        self.registry
            .snapshot()
            .iter()
            .map(|state| self.volume_info(state))
            .collect()
    }

    /// Fixed capabilities from configuration.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Current reference count for a name; 0 when not mounted.
    pub fn connections(&self, name: &str) -> usize {
        self.registry
            .get(&self.path(name))
            .map(|state| state.connections)
            .unwrap_or_default()
    }

    fn volume_info(&self, state: &VolumeState) -> VolumeInfo {
        VolumeInfo {
            name: state.name.clone(),
            mountpoint: self.path(&state.name),
        }
    }
}

impl std::fmt::Debug for VolumeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeDriver")
            .field("root", &self.root)
            .field("capabilities", &self.capabilities)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
