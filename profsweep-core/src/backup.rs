use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::error::{ProfileError, Result};
use crate::host::RemoteHost;
use crate::policy::RetryPolicy;
use crate::registry::keys::Hive;
use crate::util::digest::file_digest;

/// What to do once the export has failed `RetryPolicy::ceiling` times in a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Remediation {
    Retry,
    ClearTempAndRetry,
    Abort,
}

pub trait RemediationPrompt: Send {
    fn decide(&mut self, key: &str, failures: u32, last: &ProfileError) -> Remediation;
}

/// Gives up as soon as the ceiling is reached. Used when nobody can be asked.
pub struct AbortOnExhaustion;

impl RemediationPrompt for AbortOnExhaustion {
    fn decide(&mut self, _key: &str, _failures: u32, _last: &ProfileError) -> Remediation {
        Remediation::Abort
    }
}

/// Local and remote working directories of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkDirs {
    pub local_dir: PathBuf,
    /// Target-local path (`C:\...\<session id>`).
    pub remote_dir: String,
}

impl WorkDirs {
    pub fn remote_file(&self, hive: Hive) -> String {
        format!(r"{}\{}", self.remote_dir.trim_end_matches('\\'), hive.file_name())
    }
}

#[derive(Clone, Debug)]
pub struct AcquiredHive {
    pub hive: Hive,
    pub local_path: PathBuf,
    /// Export attempts including the successful one.
    pub attempts: u32,
    pub digest: [u8; 32],
}

/// Exports a hive on the target and brings a verified copy home.
pub struct Acquisition<'a> {
    pub host: &'a dyn RemoteHost,
    pub dirs: &'a WorkDirs,
    pub retry: &'a RetryPolicy,
    pub temp_cleanup: &'a [String],
}

impl Acquisition<'_> {
    pub fn acquire(&self, hive: Hive, prompt: &mut dyn RemediationPrompt) -> Result<AcquiredHive> {
        let key = hive.root();
        let remote_file = self.dirs.remote_file(hive);
        self.host.prepare_workdir(&self.dirs.remote_dir)?;

        let attempts = self.export_with_retry(key, &remote_file, prompt)?;
        let (local_path, digest) = self.copy_verified(&remote_file)?;
        info!(key, attempts, local = %local_path.display(), "hive acquired");
        Ok(AcquiredHive {
            hive,
            local_path,
            attempts,
            digest,
        })
    }

    fn export_with_retry(
        &self,
        key: &str,
        remote_file: &str,
        prompt: &mut dyn RemediationPrompt,
    ) -> Result<u32> {
        let mut failures = 0u32;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let err = match self.host.export_hive(key, remote_file) {
                Ok(()) => return Ok(attempts),
                Err(e) => e,
            };
            failures += 1;
            warn!(key, failures, "export failed: {err}");
            if !self.retry.exhausted(failures) {
                continue;
            }
            match prompt.decide(key, failures, &err) {
                Remediation::Retry => {
                    info!(key, "retrying export");
                }
                Remediation::ClearTempAndRetry => {
                    match self.host.clear_temp_files(self.temp_cleanup) {
                        Ok(()) => info!(key, "temp files cleared, retrying export"),
                        Err(e) => warn!(key, "temp cleanup failed, retrying anyway: {e}"),
                    }
                }
                Remediation::Abort => {
                    error!(key, attempts, "export abandoned");
                    return Err(ProfileError::ExportFailed {
                        key: key.to_string(),
                        attempts,
                    });
                }
            }
            failures = 0;
        }
    }

    fn copy_verified(&self, remote_file: &str) -> Result<(PathBuf, [u8; 32])> {
        let as_copy_error = |e: ProfileError| match e {
            ProfileError::CopyFailed { .. } => e,
            other => ProfileError::CopyFailed {
                from: remote_file.to_string(),
                detail: other.to_string(),
            },
        };
        let local = self
            .host
            .copy_file(remote_file, &self.dirs.local_dir)
            .map_err(as_copy_error)?;
        let expected = self.host.digest(remote_file).map_err(as_copy_error)?;
        let got = file_digest(&local).map_err(|e| as_copy_error(e.into()))?;
        if got != expected {
            return Err(ProfileError::CopyFailed {
                from: remote_file.to_string(),
                detail: "local copy does not match the exported file".into(),
            });
        }
        Ok((local, got))
    }
}
