use tracing::{error, info, warn};

use crate::check::{CancelToken, JobKind};
use crate::domain::EditableState;
use crate::error::Result;
use crate::host::{ProbeResult, RemoteHost};
use crate::store::update::{Batch, Update};

/// Probe every named directory for in-use locks.
///
/// A probe failure aborts the pass: it means the target is unreachable, not
/// that one profile is special.
pub fn state_check(host: &dyn RemoteHost, names: &[String], cancel: &CancelToken) -> Result<Batch> {
    let mut batch = Batch::new(JobKind::State);
    let mut locked = 0usize;
    for name in names {
        if cancel.is_cancelled() {
            warn!(done = batch.len(), "state check cancelled");
            batch.cancelled = true;
            break;
        }
        let state = match host.probe_rename(name) {
            Ok(ProbeResult::Editable) => EditableState::Editable,
            Ok(ProbeResult::Uneditable) => {
                info!(profile = %name, "profile in use, unmarked for deletion");
                locked += 1;
                EditableState::Uneditable
            }
            Err(e) => {
                error!(profile = %name, "state check aborted: {e}");
                return Err(e);
            }
        };
        batch.push(Update::State {
            name: name.clone(),
            state,
        });
    }
    info!(probed = batch.len(), locked, "state check finished");
    Ok(batch)
}
