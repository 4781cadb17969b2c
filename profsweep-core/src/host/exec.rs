use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ProfileError, Result};

const POLL: Duration = Duration::from_millis(25);
/// How long output readers get after the child is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The most useful text to show when the command failed.
    pub fn failure_text(&self) -> String {
        let err = self.stderr.trim();
        let msg = if err.is_empty() { self.stdout.trim() } else { err };
        match self.code {
            Some(c) => format!("exit {c}: {msg}"),
            None => format!("terminated: {msg}"),
        }
    }
}

/// Replace `{name}` placeholders in every argument.
pub fn fill(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (k, v)| {
                acc.replace(&format!("{{{k}}}"), v)
            })
        })
        .collect()
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            let _ = p.read_to_end(&mut buf);
        }
        buf
    })
}

/// Collect a reader's bytes, giving up after [`DRAIN_GRACE`]. A grandchild that
/// inherited the pipe keeps it open after the child itself has exited.
fn collect(op: &'static str, stream: &'static str, h: JoinHandle<Vec<u8>>) -> Vec<u8> {
    let deadline = Instant::now() + DRAIN_GRACE;
    while !h.is_finished() {
        if Instant::now() >= deadline {
            warn!(op, stream, "pipe still held open, output reader abandoned");
            return Vec::new();
        }
        thread::sleep(POLL);
    }
    h.join().unwrap_or_else(|_| {
        warn!(op, stream, "output reader panicked");
        Vec::new()
    })
}

/// Run `argv` to completion, killing it once `timeout` elapses.
pub fn run(op: &'static str, argv: &[String], timeout: Duration) -> Result<CommandOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ProfileError::Config(format!("empty command line for {op}")))?;
    debug!(op, program = %program, ?args, "spawning");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ProfileError::remote(op, format!("cannot start {program}: {e}")))?;
    let out_h = drain(child.stdout.take());
    let err_h = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            collect(op, "stdout", out_h);
            collect(op, "stderr", err_h);
            return Err(ProfileError::Timeout {
                op,
                secs: timeout.as_secs().max(1),
            });
        }
        thread::sleep(POLL);
    };

    let stdout = collect(op, "stdout", out_h);
    let stderr = collect(op, "stderr", err_h);
    Ok(CommandOutput {
        code: status.code(),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

/// Like [`run`], but a non-zero exit is a `Remote` error.
pub fn run_checked(op: &'static str, argv: &[String], timeout: Duration) -> Result<CommandOutput> {
    let out = run(op, argv, timeout)?;
    if out.success() {
        Ok(out)
    } else {
        Err(ProfileError::remote(op, out.failure_text()))
    }
}
