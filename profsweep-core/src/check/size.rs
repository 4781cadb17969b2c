use tracing::{info, warn};

use crate::check::{CancelToken, JobKind};
use crate::domain::DirSize;
use crate::host::RemoteHost;
use crate::store::update::{Batch, Update};

/// Measure every named directory. A failed measurement marks that record
/// `CouldNotCalculate` and the pass moves on.
pub fn size_check(host: &dyn RemoteHost, names: &[String], cancel: &CancelToken) -> Batch {
    let mut batch = Batch::new(JobKind::Size);
    let mut failed = 0usize;
    for name in names {
        if cancel.is_cancelled() {
            warn!(done = batch.len(), "size check cancelled");
            batch.cancelled = true;
            break;
        }
        let size = match host.measure_size(name) {
            Ok(n) => DirSize::Bytes(n),
            Err(e) => {
                warn!(profile = %name, "could not calculate size: {e}");
                failed += 1;
                DirSize::CouldNotCalculate
            }
        };
        batch.push(Update::Size {
            name: name.clone(),
            size,
        });
    }
    info!(measured = batch.len() - failed, failed, "size check finished");
    batch
}
