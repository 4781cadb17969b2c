use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SendError, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::backup::{Acquisition, RemediationPrompt, WorkDirs};
use crate::check::{CancelToken, JobKind, registry_check, size_check, state_check};
use crate::config::Settings;
use crate::delete::{DeletionReport, delete_marked};
use crate::error::{ProfileError, Result};
use crate::host::RemoteHost;
use crate::store::inmem::ProfileStore;
use crate::store::update::Batch;

/// One pipeline invocation.
pub enum Job {
    Size,
    State,
    Registry(Box<dyn RemediationPrompt>),
    Delete,
}

impl Job {
    pub fn kind(&self) -> JobKind {
        match self {
            Job::Size => JobKind::Size,
            Job::State => JobKind::State,
            Job::Registry(_) => JobKind::Registry,
            Job::Delete => JobKind::Delete,
        }
    }
}

/// What a finished job hands back to the session.
#[derive(Debug)]
pub struct JobOutcome {
    pub batch: Batch,
    pub report: Option<DeletionReport>,
    pub report_path: Option<PathBuf>,
}

impl JobOutcome {
    fn batch(batch: Batch) -> Self {
        Self {
            batch,
            report: None,
            report_path: None,
        }
    }
}

/// The one-job-at-a-time slot of a session.
#[derive(Clone, Debug, Default)]
pub struct PipelineSlot(Arc<AtomicBool>);

impl PipelineSlot {
    /// Take the slot, or `None` while another job still holds it.
    pub fn claim(&self) -> Option<SlotClaim> {
        if self.0.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(SlotClaim(Arc::new(Held(Arc::clone(&self.0)))))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Shared by a job's worker and its handle. The slot frees when both are gone.
#[derive(Clone, Debug)]
pub struct SlotClaim(Arc<Held>);

#[derive(Debug)]
struct Held(Arc<AtomicBool>);

impl Drop for Held {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Everything a job needs, owned so it can move to another thread.
pub struct JobContext {
    pub host: Arc<dyn RemoteHost>,
    pub settings: Settings,
    pub dirs: WorkDirs,
    /// The store after every earlier batch was applied.
    pub snapshot: ProfileStore,
    pub claim: SlotClaim,
    pub cancel: CancelToken,
}

/// A running job. Dropping it discards the job's batch.
#[must_use = "a job's batch is lost unless the handle is completed"]
#[derive(Debug)]
pub struct JobHandle {
    kind: JobKind,
    rx: Receiver<Result<JobOutcome>>,
    cancel: CancelToken,
    thread: Option<JoinHandle<()>>,
    _claim: SlotClaim,
}

impl JobHandle {
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking poll; `None` while the job is still running.
    pub fn try_take(&self) -> Option<Result<JobOutcome>> {
        match self.rx.try_recv() {
            Ok(r) => Some(r),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ProfileError::Unrecoverable(
                "job worker exited without a result".into(),
            ))),
        }
    }

    pub fn wait(mut self) -> Result<JobOutcome> {
        let res = self.rx.recv().map_err(|_| {
            ProfileError::Unrecoverable("job worker exited without a result".into())
        })?;
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
        res
    }
}

/// Start `job` on a background thread. The worker keeps its claim on the
/// pipeline slot until the result is sent.
pub fn spawn(job: Job, ctx: JobContext) -> Result<JobHandle> {
    let kind = job.kind();
    let cancel = ctx.cancel.clone();
    let claim = ctx.claim.clone();
    let (tx, rx) = mpsc::channel();
    let thread = thread::Builder::new()
        .name(format!("profsweep-{kind:?}").to_lowercase())
        .spawn(move || {
            debug!(?kind, "job started");
            let res = execute(job, &ctx);
            debug!(?kind, ok = res.is_ok(), "job finished");
            drop(ctx);
            if let Err(SendError(res)) = tx.send(res) {
                match res {
                    Ok(outcome) => error!(
                        ?kind,
                        updates = outcome.batch.len(),
                        "job result dropped: its handle is gone"
                    ),
                    Err(e) => error!(?kind, error = %e, "job failed with its handle gone"),
                }
            }
        })
        .map_err(|e| ProfileError::Unrecoverable(format!("cannot start worker: {e}")))?;
    Ok(JobHandle {
        kind,
        rx,
        cancel,
        thread: Some(thread),
        _claim: claim,
    })
}

fn execute(job: Job, ctx: &JobContext) -> Result<JobOutcome> {
    let host = ctx.host.as_ref();
    let names = ctx.snapshot.names();
    match job {
        Job::Size => Ok(JobOutcome::batch(size_check(host, &names, &ctx.cancel))),
        Job::State => Ok(JobOutcome::batch(state_check(host, &names, &ctx.cancel)?)),
        Job::Registry(mut prompt) => {
            let acq = Acquisition {
                host,
                dirs: &ctx.dirs,
                retry: &ctx.settings.retry,
                temp_cleanup: &ctx.settings.temp_cleanup,
            };
            let batch = registry_check(
                &acq,
                prompt.as_mut(),
                &ctx.snapshot,
                &ctx.settings.user_prefix(),
            )?;
            Ok(JobOutcome::batch(batch))
        }
        Job::Delete => {
            let (batch, report) =
                delete_marked(host, &ctx.snapshot, &ctx.settings.delete, &ctx.cancel)?;
            let path = report.save(&ctx.dirs.local_dir)?;
            info!(report = %path.display(), "deletion report written");
            Ok(JobOutcome {
                batch,
                report: Some(report),
                report_path: Some(path),
            })
        }
    }
}
