//! Shared fixtures for profsweep-core integration tests.
//!
//! `FakeHost` stands in for a Windows target. Its "admin share" is a temp
//! directory: exported hives land there and are copied out like the real thing.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use profsweep_core::registry::hex::encode_expand_sz;
use profsweep_core::registry::keys::Hive;
use profsweep_core::util::digest::file_digest;
use profsweep_core::{
    ProbeResult, ProfileError, Remediation, RemediationPrompt, RemoteDir, RemoteHost, Result,
    Settings,
};
use tempfile::TempDir;

#[derive(Default)]
struct Script {
    dirs: Vec<RemoteDir>,
    sizes: HashMap<String, u64>,
    size_errors: HashSet<String>,
    uneditable: HashSet<String>,
    probe_error: Option<String>,
    dir_delete_fails: HashSet<String>,
    key_delete_fails: HashSet<String>,
    exports: HashMap<String, String>,
    export_failures_left: u32,
    corrupt_copies: bool,
    copy_fails: bool,
    workdirs: Vec<String>,
    deleted_dirs: Vec<String>,
    deleted_keys: Vec<String>,
    temp_clears: u32,
}

pub struct FakeHost {
    computer: String,
    share: TempDir,
    script: Mutex<Script>,
    delay: Mutex<Duration>,
    export_attempts: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeHost {
    pub fn new(names: &[&str]) -> Arc<Self> {
        let dirs = names
            .iter()
            .map(|n| RemoteDir {
                name: n.to_string(),
                last_updated: "2024-03-01 09:30".to_string(),
            })
            .collect();
        Arc::new(Self {
            computer: "pc01".into(),
            share: TempDir::new().expect("share dir"),
            script: Mutex::new(Script {
                dirs,
                ..Script::default()
            }),
            delay: Mutex::new(Duration::ZERO),
            export_attempts: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        f(&mut self.script.lock().expect("script lock"))
    }

    pub fn set_size(&self, dir: &str, n: u64) {
        self.with(|s| s.sizes.insert(dir.into(), n));
    }

    pub fn fail_size(&self, dir: &str) {
        self.with(|s| s.size_errors.insert(dir.into()));
    }

    pub fn set_uneditable(&self, dir: &str) {
        self.with(|s| s.uneditable.insert(dir.into()));
    }

    pub fn fail_probe(&self, dir: &str) {
        self.with(|s| s.probe_error = Some(dir.into()));
    }

    pub fn fail_dir_delete(&self, dir: &str) {
        self.with(|s| s.dir_delete_fails.insert(dir.into()));
    }

    pub fn fail_key_delete(&self, key: &str) {
        self.with(|s| s.key_delete_fails.insert(key.into()));
    }

    pub fn set_export(&self, hive: Hive, text: String) {
        self.with(|s| s.exports.insert(hive.root().to_string(), text));
    }

    pub fn fail_exports(&self, n: u32) {
        self.with(|s| s.export_failures_left = n);
    }

    pub fn corrupt_copies(&self) {
        self.with(|s| s.corrupt_copies = true);
    }

    pub fn fail_copies(&self) {
        self.with(|s| s.copy_fails = true);
    }

    pub fn set_delay(&self, d: Duration) {
        *self.delay.lock().expect("delay lock") = d;
    }

    pub fn export_attempts(&self) -> usize {
        self.export_attempts.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn workdirs(&self) -> Vec<String> {
        self.with(|s| s.workdirs.clone())
    }

    pub fn deleted_dirs(&self) -> Vec<String> {
        self.with(|s| s.deleted_dirs.clone())
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.with(|s| s.deleted_keys.clone())
    }

    pub fn temp_clears(&self) -> u32 {
        self.with(|s| s.temp_clears)
    }

    fn share_path(&self, remote_file: &str) -> PathBuf {
        let name = remote_file.rsplit('\\').next().unwrap_or(remote_file);
        self.share.path().join(name)
    }

    fn busy(&self) -> Busy<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let d = *self.delay.lock().expect("delay lock");
        if !d.is_zero() {
            std::thread::sleep(d);
        }
        Busy(&self.active)
    }
}

struct Busy<'a>(&'a AtomicUsize);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `reg export` writes UTF-16LE with a BOM.
fn utf16_with_bom(text: &str) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFE];
    for u in text.encode_utf16() {
        out.extend_from_slice(&u.to_le_bytes());
    }
    out
}

impl RemoteHost for FakeHost {
    fn computer(&self) -> &str {
        &self.computer
    }

    fn ping(&self) -> Result<bool> {
        Ok(true)
    }

    fn list_directories(&self) -> Result<Vec<RemoteDir>> {
        Ok(self.with(|s| s.dirs.clone()))
    }

    fn measure_size(&self, dir: &str) -> Result<u64> {
        let _busy = self.busy();
        self.with(|s| {
            if s.size_errors.contains(dir) {
                return Err(ProfileError::NonNumeric("Access is denied.".into()));
            }
            Ok(s.sizes.get(dir).copied().unwrap_or(0))
        })
    }

    fn probe_rename(&self, dir: &str) -> Result<ProbeResult> {
        let _busy = self.busy();
        self.with(|s| {
            if s.probe_error.as_deref() == Some(dir) {
                return Err(ProfileError::remote("probe", "network path not found"));
            }
            if s.uneditable.contains(dir) {
                Ok(ProbeResult::Uneditable)
            } else {
                Ok(ProbeResult::Editable)
            }
        })
    }

    fn delete_directory(&self, dir: &str) -> Result<()> {
        self.with(|s| {
            if s.dir_delete_fails.contains(dir) {
                return Err(ProfileError::remote("delete directory", "file in use"));
            }
            s.deleted_dirs.push(dir.to_string());
            s.dirs.retain(|d| d.name != dir);
            Ok(())
        })
    }

    fn delete_registry_key(&self, key: &str) -> Result<()> {
        self.with(|s| {
            if s.key_delete_fails.iter().any(|k| key.ends_with(k.as_str())) {
                return Err(ProfileError::remote("delete key", "access denied"));
            }
            s.deleted_keys.push(key.to_string());
            Ok(())
        })
    }

    fn prepare_workdir(&self, remote_dir: &str) -> Result<()> {
        self.with(|s| s.workdirs.push(remote_dir.to_string()));
        Ok(())
    }

    fn export_hive(&self, key: &str, remote_file: &str) -> Result<()> {
        self.export_attempts.fetch_add(1, Ordering::SeqCst);
        let text = self.with(|s| {
            if s.export_failures_left > 0 {
                s.export_failures_left -= 1;
                return Err(ProfileError::remote("export", "the system cannot find the path"));
            }
            Ok(s.exports.get(key).cloned().unwrap_or_default())
        })?;
        std::fs::write(self.share_path(remote_file), utf16_with_bom(&text))?;
        Ok(())
    }

    fn copy_file(&self, remote_file: &str, local_dir: &Path) -> Result<PathBuf> {
        let (fails, corrupt) = self.with(|s| (s.copy_fails, s.corrupt_copies));
        if fails {
            return Err(ProfileError::CopyFailed {
                from: remote_file.to_string(),
                detail: "network name no longer available".into(),
            });
        }
        let src = self.share_path(remote_file);
        let dst = local_dir.join(src.file_name().unwrap_or_default());
        std::fs::copy(&src, &dst)?;
        if corrupt {
            let mut bytes = std::fs::read(&dst)?;
            bytes.push(0);
            std::fs::write(&dst, bytes)?;
        }
        Ok(dst)
    }

    fn digest(&self, remote_file: &str) -> Result<[u8; 32]> {
        Ok(file_digest(&self.share_path(remote_file))?)
    }

    fn clear_temp_files(&self, _remote_paths: &[String]) -> Result<()> {
        self.with(|s| s.temp_clears += 1);
        Ok(())
    }
}

/// Answers remediation prompts from a script and records each call.
pub struct ScriptedPrompt {
    answers: VecDeque<Remediation>,
    calls: Arc<Mutex<Vec<u32>>>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[Remediation]) -> (Self, Arc<Mutex<Vec<u32>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                answers: answers.iter().copied().collect(),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl RemediationPrompt for ScriptedPrompt {
    fn decide(&mut self, _key: &str, failures: u32, _last: &ProfileError) -> Remediation {
        self.calls.lock().expect("calls lock").push(failures);
        self.answers.pop_front().unwrap_or(Remediation::Abort)
    }
}

pub fn settings(root: &Path) -> Settings {
    Settings {
        session_root: root.join("sessions"),
        ..Settings::default()
    }
}

/// One block of a profile-list export.
pub struct ListBlock<'a> {
    pub sid: &'a str,
    pub path: &'a str,
    pub guid: Option<&'a str>,
}

pub fn profile_list_export(blocks: &[ListBlock<'_>]) -> String {
    let mut out = String::from("Windows Registry Editor Version 5.00\r\n\r\n");
    out.push_str(&format!("[{}]\r\n\r\n", Hive::ProfileList.root()));
    for b in blocks {
        out.push_str(&format!("[{}]\r\n", Hive::ProfileList.child(b.sid)));
        out.push_str("\"Flags\"=dword:00000000\r\n");
        out.push_str(&format!(
            "\"ProfileImagePath\"={}\r\n",
            encode_expand_sz(b.path)
        ));
        if let Some(g) = b.guid {
            out.push_str(&format!("\"Guid\"=\"{g}\"\r\n"));
        }
        out.push_str("\r\n");
    }
    out
}

pub fn profile_guid_export(pairs: &[(&str, &str)]) -> String {
    let mut out = String::from("Windows Registry Editor Version 5.00\r\n\r\n");
    out.push_str(&format!("[{}]\r\n\r\n", Hive::ProfileGuid.root()));
    for (guid, sid) in pairs {
        out.push_str(&format!("[{}]\r\n", Hive::ProfileGuid.child(guid)));
        out.push_str(&format!("\"SidString\"=\"{sid}\"\r\n\r\n"));
    }
    out
}

/// Host holding alice, bob and Public, with alice fully registered and bob
/// known only to the profile list.
pub fn alice_and_bob() -> Arc<FakeHost> {
    let host = FakeHost::new(&["alice", "bob", "Public"]);
    host.set_export(
        Hive::ProfileList,
        profile_list_export(&[
            ListBlock {
                sid: "S-1-5-21-1",
                path: r"C:\Users\alice",
                guid: Some("{GUID-X}"),
            },
            ListBlock {
                sid: "S-1-5-21-2",
                path: r"C:\Users\bob",
                guid: None,
            },
        ]),
    );
    host.set_export(
        Hive::ProfileGuid,
        profile_guid_export(&[("{GUID-X}", "S-1-5-21-1")]),
    );
    host
}
