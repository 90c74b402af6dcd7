//! Shared fixtures for sshvol integration tests.
//!
//! - [`RecordingMounter`]: a [`Mounter`] that records calls instead of
//!   running sshfs, with injectable failures and delays
//! - [`TestContext`]: an isolated driver rooted in a temp directory

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use sshvol::{DriverOptions, Mounter, RemoteSource, SshvolError, SshvolResult, VolumeDriver};
use tempfile::TempDir;

/// One recorded mount call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MountCall {
    pub source: String,
    pub target: PathBuf,
}

#[derive(Debug, Default)]
struct Recorder {
    mounts: Vec<MountCall>,
    unmounts: Vec<PathBuf>,
    /// Targets with a call currently inside the mounter.
    active: HashSet<PathBuf>,
    /// Set when two calls for one target overlapped.
    overlapped: bool,
    /// Highest number of calls inside the mounter at once, any target.
    max_parallel: usize,
    fail_mount: Option<String>,
    fail_unmount: Option<String>,
    mount_delays: HashMap<String, Duration>,
}

/// Fake mount executor.
///
/// Mount and unmount calls are recorded in order. A call can be made slow
/// per host to open race windows, and overlapping calls on the same target
/// are detected.
#[derive(Debug, Default)]
pub struct RecordingMounter {
    recorder: Mutex<Recorder>,
}

impl RecordingMounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every following mount fail with this stderr text.
    pub fn fail_mounts(&self, stderr: impl Into<String>) {
        self.recorder.lock().fail_mount = Some(stderr.into());
    }

    /// Make every following unmount fail with this stderr text.
    pub fn fail_unmounts(&self, stderr: impl Into<String>) {
        self.recorder.lock().fail_unmount = Some(stderr.into());
    }

    /// Let mounts and unmounts succeed again.
    pub fn heal(&self) {
        let mut recorder = self.recorder.lock();
        recorder.fail_mount = None;
        recorder.fail_unmount = None;
    }

    /// Make mounts of `host` sleep for `delay` before returning.
    pub fn delay_mounts_of(&self, host: impl Into<String>, delay: Duration) {
        self.recorder.lock().mount_delays.insert(host.into(), delay);
    }

    pub fn mounts(&self) -> Vec<MountCall> {
        self.recorder.lock().mounts.clone()
    }

    pub fn unmounts(&self) -> Vec<PathBuf> {
        self.recorder.lock().unmounts.clone()
    }

    pub fn mount_count(&self) -> usize {
        self.recorder.lock().mounts.len()
    }

    pub fn unmount_count(&self) -> usize {
        self.recorder.lock().unmounts.len()
    }

    /// True if two calls for the same target were ever in flight together.
    pub fn saw_overlap(&self) -> bool {
        self.recorder.lock().overlapped
    }

    pub fn max_parallel(&self) -> usize {
        self.recorder.lock().max_parallel
    }

    fn enter(&self, target: &Path) {
        let mut recorder = self.recorder.lock();
        if !recorder.active.insert(target.to_path_buf()) {
            recorder.overlapped = true;
        }
        recorder.max_parallel = recorder.max_parallel.max(recorder.active.len());
    }

    fn leave(&self, target: &Path) {
        self.recorder.lock().active.remove(target);
    }
}

impl Mounter for RecordingMounter {
    fn mount(&self, source: &RemoteSource, target: &Path) -> SshvolResult<()> {
        self.enter(target);
        let delay = self.recorder.lock().mount_delays.get(source.host()).copied();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let result = {
            let mut recorder = self.recorder.lock();
            match recorder.fail_mount.clone() {
                Some(stderr) => Err(SshvolError::MountFailed {
                    remote: source.to_string(),
                    target: target.to_path_buf(),
                    status: "exit status: 1".to_string(),
                    stderr,
                }),
                None => {
                    recorder.mounts.push(MountCall {
                        source: source.to_string(),
                        target: target.to_path_buf(),
                    });
                    Ok(())
                }
            }
        };
        self.leave(target);
        result
    }

    fn unmount(&self, target: &Path) -> SshvolResult<()> {
        self.enter(target);
        let result = {
            let mut recorder = self.recorder.lock();
            match recorder.fail_unmount.clone() {
                Some(stderr) => Err(SshvolError::UnmountFailed {
                    target: target.to_path_buf(),
                    status: "exit status: 32".to_string(),
                    stderr,
                }),
                None => {
                    recorder.unmounts.push(target.to_path_buf());
                    Ok(())
                }
            }
        };
        self.leave(target);
        result
    }
}

/// Isolated driver with a recording mounter and automatic cleanup.
pub struct TestContext {
    pub driver: Arc<VolumeDriver>,
    pub mounter: Arc<RecordingMounter>,
    pub root: PathBuf,
    _temp_dir: TempDir, // Dropped after test
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_options(|options| options)
    }

    /// Build a context, letting the caller adjust the default options.
    pub fn with_options(configure: impl FnOnce(DriverOptions) -> DriverOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("volumes");
        let mounter = RecordingMounter::new();
        let options = configure(DriverOptions::with_root(&root));
        let driver = VolumeDriver::with_mounter(options, mounter.clone())
            .expect("Failed to create driver");
        Self {
            driver: Arc::new(driver),
            mounter,
            root,
            _temp_dir: temp_dir,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
