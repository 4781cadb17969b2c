use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backup::WorkDirs;
use crate::check::CancelToken;
use crate::config::Settings;
use crate::error::{ProfileError, Result};
use crate::host::RemoteHost;
use crate::store::inmem::ProfileStore;
use crate::store::update::{Batch, Update};
use crate::worker::{self, Job, JobContext, JobHandle, JobOutcome, PipelineSlot};

/// Store change notification sent to subscribers after a batch is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    Updated { name: String },
    Removed { name: String },
    IdentityResolved,
    Reloaded,
}

/// One unit of work against a single remote target.
///
/// The session is the only writer of its [`ProfileStore`]. Jobs run on worker
/// threads against a snapshot and hand back a [`Batch`] that is applied here.
/// One job is in flight at a time, so every snapshot already carries the
/// batches of the jobs before it.
pub struct Session {
    id: Uuid,
    settings: Settings,
    host: Arc<dyn RemoteHost>,
    dirs: WorkDirs,
    store: ProfileStore,
    slot: PipelineSlot,
    observers: Vec<Sender<StoreEvent>>,
}

impl Session {
    /// Create the session directories and load the profile listing.
    pub fn open(host: Arc<dyn RemoteHost>, settings: Settings) -> Result<Self> {
        if host.computer().trim().is_empty() {
            return Err(ProfileError::NotInitialized("no target computer".into()));
        }
        settings.validate()?;

        let id = Uuid::new_v4();
        let local_dir = settings.session_root.join(id.to_string());
        std::fs::create_dir_all(&local_dir)?;
        let remote_dir = format!(
            r"{}\{}",
            settings.remote_work_root.trim_end_matches('\\'),
            id
        );
        let dirs = WorkDirs {
            local_dir,
            remote_dir,
        };

        let store = ProfileStore::from_listing(host.list_directories()?);
        info!(
            session = %id,
            computer = host.computer(),
            profiles = store.len(),
            local = %dirs.local_dir.display(),
            "session opened"
        );
        Ok(Self {
            id,
            settings,
            host,
            dirs,
            store,
            slot: PipelineSlot::default(),
            observers: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn computer(&self) -> &str {
        self.host.computer()
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn dirs(&self) -> &WorkDirs {
        &self.dirs
    }

    pub fn local_dir(&self) -> &Path {
        &self.dirs.local_dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Receive a [`StoreEvent`] for every change applied from now on.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    fn notify(&mut self, ev: StoreEvent) {
        self.observers.retain(|tx| tx.send(ev.clone()).is_ok());
    }

    /// Replace the store with a fresh listing. Resolved identities are lost.
    pub fn reload(&mut self) -> Result<()> {
        self.store = ProfileStore::from_listing(self.host.list_directories()?);
        info!(session = %self.id, profiles = self.store.len(), "listing reloaded");
        self.notify(StoreEvent::Reloaded);
        Ok(())
    }

    pub fn mark(&mut self, name: &str, marked: bool) -> Result<()> {
        self.store.mark(name, marked)?;
        debug!(profile = name, marked, "mark changed");
        self.notify(StoreEvent::Updated {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Apply a job's updates in order. Returns how many changed the store.
    pub fn apply(&mut self, batch: &Batch) -> usize {
        let mut applied = 0;
        for u in &batch.updates {
            if !self.store.apply(u) {
                debug!(update = ?u, "update for a record no longer present");
                continue;
            }
            applied += 1;
            let ev = match u {
                Update::Size { name, .. }
                | Update::State { name, .. }
                | Update::Identity { name, .. } => StoreEvent::Updated { name: name.clone() },
                Update::IdentityResolved => StoreEvent::IdentityResolved,
                Update::Removed { name } => StoreEvent::Removed { name: name.clone() },
            };
            self.notify(ev);
        }
        if batch.cancelled {
            warn!(kind = ?batch.kind, applied, "partial batch applied after cancellation");
        } else {
            debug!(kind = ?batch.kind, applied, "batch applied");
        }
        applied
    }

    /// True while a submitted job has not finished or its handle is alive.
    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    /// Start `job` in the background against the store as it is now.
    ///
    /// Fails with [`ProfileError::Busy`] while an earlier job is in flight.
    /// Apply that job's batch before dropping its handle.
    pub fn submit(&self, job: Job, cancel: CancelToken) -> Result<JobHandle> {
        let Some(claim) = self.slot.claim() else {
            warn!(session = %self.id, kind = ?job.kind(), "job refused: pipeline busy");
            return Err(ProfileError::Busy);
        };
        let ctx = JobContext {
            host: Arc::clone(&self.host),
            settings: self.settings.clone(),
            dirs: self.dirs.clone(),
            snapshot: self.store.clone(),
            claim,
            cancel,
        };
        info!(session = %self.id, kind = ?job.kind(), "job submitted");
        worker::spawn(job, ctx)
    }

    /// Wait for a submitted job and apply its batch.
    pub fn complete(&mut self, handle: JobHandle) -> Result<JobOutcome> {
        let outcome = handle.wait()?;
        self.apply(&outcome.batch);
        Ok(outcome)
    }

    /// Submit, wait and apply.
    pub fn run(&mut self, job: Job) -> Result<JobOutcome> {
        let handle = self.submit(job, CancelToken::new())?;
        self.complete(handle)
    }

    pub fn close(self) {
        info!(
            session = %self.id,
            computer = self.host.computer(),
            remaining = self.store.len(),
            "session closed"
        );
    }
}
