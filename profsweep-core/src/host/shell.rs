use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, info};

use crate::config::unc_path;
use crate::domain::RemoteDir;
use crate::error::{ProfileError, Result};
use crate::host::exec::{fill, run, run_checked};
use crate::host::{HostParams, ProbeResult, RemoteHost};
use crate::registry::keys::remote_key;
use crate::util::digest::file_digest;

// Windows ERROR_SHARING_VIOLATION: the directory is held open by a logged-on user.
const SHARING_VIOLATION: i32 = 32;

/// Talks to a Windows target through its admin shares, `reg.exe` and a
/// remote-exec tool.
pub struct ShellHost {
    params: HostParams,
}

impl ShellHost {
    pub fn new(params: HostParams) -> Result<Self> {
        params.settings.validate()?;
        Ok(Self { params })
    }

    fn settings(&self) -> &crate::config::Settings {
        &self.params.settings
    }

    fn unc(&self, local: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(unc_path(&self.params.computer, local)?))
    }

    fn users_local(&self, dir: &str) -> String {
        format!("{}{}", self.settings().user_prefix(), dir)
    }

    fn dir_unc(&self, dir: &str) -> Result<PathBuf> {
        self.unc(&self.users_local(dir))
    }

    fn on_target(&self, argv: &[&str]) -> Vec<String> {
        let mut cmd = fill(
            &self.settings().remote_exec,
            &[("computer", self.params.computer.as_str())],
        );
        cmd.extend(argv.iter().map(|a| a.to_string()));
        cmd
    }

    fn skipped(&self, name: &str) -> bool {
        self.settings()
            .skip_dirs
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name))
    }
}

fn format_mtime(t: SystemTime) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]");
    OffsetDateTime::from(t)
        .format(fmt)
        .unwrap_or_else(|_| String::from("?"))
}

impl RemoteHost for ShellHost {
    fn computer(&self) -> &str {
        &self.params.computer
    }

    fn ping(&self) -> Result<bool> {
        let c = self.params.computer.as_str();
        let argv: Vec<String> = if cfg!(windows) {
            ["ping", "-n", "1", "-w", "1000", c]
        } else {
            ["ping", "-c", "1", "-W", "1", c]
        }
        .iter()
        .map(|s| s.to_string())
        .collect();
        Ok(run("ping", &argv, self.params.timeout())?.success())
    }

    fn list_directories(&self) -> Result<Vec<RemoteDir>> {
        let root = self.unc(&self.settings().users_root)?;
        let rd = std::fs::read_dir(&root).map_err(|e| {
            ProfileError::remote("list", format!("{}: {e}", root.display()))
        })?;
        let mut out = Vec::new();
        for entry in rd {
            let entry = entry.map_err(|e| ProfileError::remote("list", e.to_string()))?;
            let md = match entry.metadata() {
                Ok(md) => md,
                Err(e) => {
                    debug!(path = %entry.path().display(), "metadata unavailable: {e}");
                    continue;
                }
            };
            if !md.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.skipped(&name) {
                continue;
            }
            let last_updated = md.modified().map(format_mtime).unwrap_or_default();
            out.push(RemoteDir { name, last_updated });
        }
        Ok(out)
    }

    fn measure_size(&self, dir: &str) -> Result<u64> {
        if let Some(template) = &self.settings().size_command {
            let local = self.users_local(dir);
            let argv = fill(
                template,
                &[
                    ("computer", self.params.computer.as_str()),
                    ("path", local.as_str()),
                ],
            );
            let out = run_checked("size", &argv, self.params.timeout())?;
            return parse_size(&out.stdout);
        }
        let root = self.dir_unc(dir)?;
        let mut total = 0u64;
        for entry in walkdir::WalkDir::new(&root) {
            let entry = entry.map_err(|e| ProfileError::remote("size", e.to_string()))?;
            if entry.file_type().is_file() {
                let md = entry
                    .metadata()
                    .map_err(|e| ProfileError::remote("size", e.to_string()))?;
                total = total.saturating_add(md.len());
            }
        }
        Ok(total)
    }

    fn probe_rename(&self, dir: &str) -> Result<ProbeResult> {
        let p = self.dir_unc(dir)?;
        match std::fs::rename(&p, &p) {
            Ok(()) => Ok(ProbeResult::Editable),
            Err(e)
                if e.kind() == ErrorKind::PermissionDenied
                    || e.raw_os_error() == Some(SHARING_VIOLATION) =>
            {
                Ok(ProbeResult::Uneditable)
            }
            Err(e) => Err(ProfileError::remote(
                "probe",
                format!("{}: {e}", p.display()),
            )),
        }
    }

    fn delete_directory(&self, dir: &str) -> Result<()> {
        let p = self.dir_unc(dir)?;
        std::fs::remove_dir_all(&p)
            .map_err(|e| ProfileError::remote("delete directory", format!("{}: {e}", p.display())))
    }

    fn delete_registry_key(&self, key: &str) -> Result<()> {
        let argv = vec![
            "reg".to_string(),
            "delete".to_string(),
            remote_key(&self.params.computer, key),
            "/f".to_string(),
        ];
        run_checked("delete key", &argv, self.params.timeout())?;
        Ok(())
    }

    fn prepare_workdir(&self, remote_dir: &str) -> Result<()> {
        let p = self.unc(remote_dir)?;
        std::fs::create_dir_all(&p)
            .map_err(|e| ProfileError::remote("workdir", format!("{}: {e}", p.display())))
    }

    fn export_hive(&self, key: &str, remote_file: &str) -> Result<()> {
        let argv = self.on_target(&["reg", "export", key, remote_file, "/y"]);
        run_checked("export", &argv, self.params.timeout())?;
        Ok(())
    }

    fn copy_file(&self, remote_file: &str, local_dir: &Path) -> Result<PathBuf> {
        let src = self.unc(remote_file)?;
        let name = remote_file.rsplit('\\').next().unwrap_or(remote_file);
        let dst = local_dir.join(name);
        std::fs::copy(&src, &dst).map_err(|e| ProfileError::CopyFailed {
            from: src.display().to_string(),
            detail: e.to_string(),
        })?;
        info!(from = %src.display(), to = %dst.display(), "copied export");
        Ok(dst)
    }

    fn digest(&self, remote_file: &str) -> Result<[u8; 32]> {
        let p = self.unc(remote_file)?;
        Ok(file_digest(&p)?)
    }

    fn clear_temp_files(&self, remote_paths: &[String]) -> Result<()> {
        for p in remote_paths {
            let argv = self.on_target(&["cmd", "/c", "del", "/f", "/q", p.as_str()]);
            run_checked("clear temp", &argv, self.params.timeout())?;
            info!(path = %p, "cleared remote temp files");
        }
        Ok(())
    }
}

/// Parse the byte count printed by a size command.
pub fn parse_size(stdout: &str) -> Result<u64> {
    let t = stdout.trim();
    t.parse::<u64>()
        .map_err(|_| ProfileError::NonNumeric(t.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn host() -> ShellHost {
        ShellHost::new(HostParams {
            computer: "pc01".into(),
            settings: Settings::default(),
        })
        .unwrap()
    }

    #[test]
    fn size_output_must_be_numeric() {
        assert_eq!(parse_size(" 1024\r\n").unwrap(), 1024);
        assert!(matches!(parse_size("Access is denied."), Err(ProfileError::NonNumeric(_))));
        assert!(matches!(parse_size(""), Err(ProfileError::NonNumeric(_))));
    }

    #[test]
    fn profile_paths_use_admin_share() {
        let h = host();
        assert_eq!(
            h.dir_unc("alice").unwrap(),
            PathBuf::from(r"\\pc01\C$\Users\alice")
        );
    }

    #[test]
    fn remote_commands_get_exec_prefix() {
        let h = host();
        assert_eq!(
            h.on_target(&["reg", "export"]),
            vec!["psexec", r"\\pc01", "-s", "-accepteula", "reg", "export"]
        );
    }

    #[test]
    fn skip_list_ignores_case() {
        let h = host();
        assert!(h.skipped("default user"));
        assert!(!h.skipped("Public"));
    }

    #[test]
    fn invalid_settings_rejected() {
        let mut settings = Settings::default();
        settings.op_timeout_secs = 0;
        assert!(
            ShellHost::new(HostParams {
                computer: "pc01".into(),
                settings,
            })
            .is_err()
        );
    }
}
