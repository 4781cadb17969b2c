use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};
use crate::policy::{DeletePolicy, RetryPolicy};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the profiles, as seen on the target (`C:\Users`).
    pub users_root: String,
    /// Where exports are written on the target; a per-session subdirectory is added.
    pub remote_work_root: String,
    /// Local directory receiving session directories and the log file.
    pub session_root: PathBuf,
    /// argv prefix that runs a command on the target. `{computer}` is substituted.
    pub remote_exec: Vec<String>,
    /// Optional argv printing a byte count for `{path}`; absent means walk the admin share.
    pub size_command: Option<Vec<String>>,
    pub op_timeout_secs: u64,
    pub skip_dirs: Vec<String>,
    /// Remote paths removed by the "clear temp files" remediation.
    pub temp_cleanup: Vec<String>,
    pub retry: RetryPolicy,
    pub delete: DeletePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            users_root: r"C:\Users".into(),
            remote_work_root: r"C:\Windows\Temp\profsweep".into(),
            session_root: PathBuf::from("profsweep-sessions"),
            remote_exec: vec![
                "psexec".into(),
                r"\\{computer}".into(),
                "-s".into(),
                "-accepteula".into(),
            ],
            size_command: None,
            op_timeout_secs: 120,
            skip_dirs: vec!["Default".into(), "Default User".into(), "All Users".into()],
            temp_cleanup: vec![
                r"C:\Windows\Temp\*.tmp".into(),
                r"C:\Windows\Temp\*.log".into(),
            ],
            retry: RetryPolicy::default(),
            delete: DeletePolicy::default(),
        }
    }
}

impl Settings {
    /// Load from a TOML file; `None` yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ProfileError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.ceiling == 0 {
            return Err(ProfileError::Config("retry.ceiling must be at least 1".into()));
        }
        if self.op_timeout_secs == 0 {
            return Err(ProfileError::Config("op_timeout_secs must be at least 1".into()));
        }
        if drive_letter(&self.users_root).is_none() {
            return Err(ProfileError::Config(format!(
                "users_root must be an absolute drive path, got {:?}",
                self.users_root
            )));
        }
        if drive_letter(&self.remote_work_root).is_none() {
            return Err(ProfileError::Config(format!(
                "remote_work_root must be an absolute drive path, got {:?}",
                self.remote_work_root
            )));
        }
        if self.remote_exec.is_empty() {
            return Err(ProfileError::Config("remote_exec must name a program".into()));
        }
        Ok(())
    }

    /// Prefix stripped from `ProfileImagePath` to recover the account name.
    pub fn user_prefix(&self) -> String {
        let mut p = self.users_root.trim_end_matches('\\').to_string();
        p.push('\\');
        p
    }
}

fn drive_letter(path: &str) -> Option<char> {
    let mut chars = path.chars();
    let letter = chars.next()?;
    if letter.is_ascii_alphabetic() && chars.next() == Some(':') && chars.next() == Some('\\') {
        Some(letter)
    } else {
        None
    }
}

/// Translate a target-local path (`C:\x\y`) into its admin-share form (`\\host\C$\x\y`).
pub fn unc_path(computer: &str, local: &str) -> Result<String> {
    let letter = drive_letter(local)
        .ok_or_else(|| ProfileError::Config(format!("not a drive path: {local:?}")))?;
    Ok(format!(r"\\{}\{}${}", computer, letter.to_ascii_uppercase(), &local[2..]))
}
