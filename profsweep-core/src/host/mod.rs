// profsweep_core/src/host/mod.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Settings;
use crate::domain::RemoteDir;
use crate::error::Result;

pub mod exec;
pub mod shell;

/// Outcome of renaming a profile directory onto itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeResult {
    Editable,
    Uneditable,
}

#[derive(Clone, Debug)]
pub struct HostParams {
    pub computer: String,
    pub settings: Settings,
}

impl HostParams {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.op_timeout_secs)
    }
}

/// Everything the core asks of the machine being cleaned.
///
/// Paths named `remote_*` are in the target's own namespace (`C:\...`);
/// directory names are relative to the configured users root.
pub trait RemoteHost: Send + Sync {
    fn computer(&self) -> &str;

    fn ping(&self) -> Result<bool>;

    fn list_directories(&self) -> Result<Vec<RemoteDir>>;

    fn measure_size(&self, dir: &str) -> Result<u64>;

    fn probe_rename(&self, dir: &str) -> Result<ProbeResult>;

    fn delete_directory(&self, dir: &str) -> Result<()>;

    fn delete_registry_key(&self, key: &str) -> Result<()>;

    /// Create the session working directory on the target.
    fn prepare_workdir(&self, remote_dir: &str) -> Result<()>;

    /// Write `key` to `remote_file` on the target.
    fn export_hive(&self, key: &str, remote_file: &str) -> Result<()>;

    /// Copy `remote_file` into `local_dir`, returning the local path.
    fn copy_file(&self, remote_file: &str, local_dir: &Path) -> Result<PathBuf>;

    /// BLAKE3 digest of a file on the target.
    fn digest(&self, remote_file: &str) -> Result<[u8; 32]>;

    fn clear_temp_files(&self, remote_paths: &[String]) -> Result<()>;
}
