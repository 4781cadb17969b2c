use tracing::{error, info, warn};

use crate::check::{CancelToken, JobKind};
use crate::error::{ProfileError, Result};
use crate::host::RemoteHost;
use crate::policy::DeletePolicy;
use crate::registry::keys::Hive;
use crate::store::inmem::ProfileStore;
use crate::store::update::{Batch, Update};

pub mod report;

pub use report::{DeletionReport, DeletionRow};

/// Result of one of the three independent deletions for a profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(String),
    /// Nothing to delete: the identifier was never resolved.
    Blank,
}

impl Outcome {
    fn from_result(r: Result<()>) -> Self {
        match r {
            Ok(()) => Outcome::Success,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

fn delete_key(host: &dyn RemoteHost, hive: Hive, leaf: Option<&str>) -> Outcome {
    match leaf {
        None => Outcome::Blank,
        Some(l) => Outcome::from_result(host.delete_registry_key(&hive.child(l))),
    }
}

/// Delete every marked profile: directory, SID key, GUID key, in that order,
/// each attempted regardless of how the others went.
///
/// Refused until identity resolution has completed, otherwise registry keys
/// would be reported blank for profiles that do have them.
pub fn delete_marked(
    host: &dyn RemoteHost,
    store: &ProfileStore,
    policy: &DeletePolicy,
    cancel: &CancelToken,
) -> Result<(Batch, DeletionReport)> {
    if !store.identity_resolved() {
        let e = ProfileError::NotInitialized("identity resolution has not completed".into());
        error!("deletion refused: {e}");
        return Err(e);
    }

    let mut batch = Batch::new(JobKind::Delete);
    let mut report = DeletionReport::default();
    for rec in store.marked() {
        if cancel.is_cancelled() {
            warn!(done = report.rows.len(), "deletion cancelled");
            batch.cancelled = true;
            break;
        }
        if rec.is_public() {
            warn!(profile = %rec.name, "protected profile skipped");
            continue;
        }

        let directory = Outcome::from_result(host.delete_directory(&rec.name));
        let sid_key = delete_key(host, Hive::ProfileList, rec.sid.as_deref());
        let guid_key = delete_key(host, Hive::ProfileGuid, rec.guid.as_deref());

        let row = DeletionRow {
            user: rec.name.clone(),
            directory,
            sid_key,
            guid_key,
        };
        if row.all_done() {
            info!(profile = %rec.name, "profile deleted");
        } else {
            warn!(
                profile = %rec.name,
                directory = ?row.directory,
                sid = ?row.sid_key,
                guid = ?row.guid_key,
                "profile partially deleted"
            );
        }

        if row.directory.succeeded() || policy.drop_failed_directories {
            batch.push(Update::Removed {
                name: rec.name.clone(),
            });
        }
        report.rows.push(row);
    }
    info!(
        attempted = report.rows.len(),
        removed = batch.len(),
        "deletion finished"
    );
    Ok((batch, report))
}
