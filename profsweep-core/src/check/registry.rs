use std::path::Path;

use tracing::{error, info};

use crate::backup::{Acquisition, RemediationPrompt};
use crate::check::JobKind;
use crate::error::Result;
use crate::registry::correlate::{GuidIndex, correlate};
use crate::registry::keys::Hive;
use crate::registry::parse::{decode_export_bytes, parse_export};
use crate::store::inmem::ProfileStore;
use crate::store::update::{Batch, Update};

/// Read a copied export from disk and decode it to text.
pub fn read_export(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(decode_export_bytes(&bytes)?)
}

/// Correlate two export texts against `store`.
///
/// Every record gets an `Identity` update (absent pairs clear stale values),
/// followed by `IdentityResolved`.
pub fn resolve_identities(
    profile_list: &str,
    profile_guid: &str,
    store: &ProfileStore,
    user_prefix: &str,
) -> Result<Batch> {
    let list = parse_export(profile_list)?;
    let guid = parse_export(profile_guid)?;
    let index = GuidIndex::build(&guid);
    let c = correlate(&list, &index, store, user_prefix);

    let mut batch = Batch::new(JobKind::Registry);
    for name in store.names() {
        let (sid, guid) = match c.assignments.get(&name) {
            Some(a) => (Some(a.sid.clone()), a.guid.clone()),
            None => (None, None),
        };
        batch.push(Update::Identity { name, sid, guid });
    }
    batch.push(Update::IdentityResolved);
    info!(
        resolved = c.assignments.len(),
        discarded = c.discarded,
        guids = index.len(),
        "identity resolution finished"
    );
    Ok(batch)
}

/// Export both hives, parse them and correlate. Any failure aborts the whole
/// check and leaves earlier identities alone, since nothing is applied.
pub fn registry_check(
    acq: &Acquisition<'_>,
    prompt: &mut dyn RemediationPrompt,
    store: &ProfileStore,
    user_prefix: &str,
) -> Result<Batch> {
    acquire_and_resolve(acq, prompt, store, user_prefix)
        .inspect_err(|e| error!("registry check aborted: {e}"))
}

fn acquire_and_resolve(
    acq: &Acquisition<'_>,
    prompt: &mut dyn RemediationPrompt,
    store: &ProfileStore,
    user_prefix: &str,
) -> Result<Batch> {
    let list = acq.acquire(Hive::ProfileList, prompt)?;
    let guid = acq.acquire(Hive::ProfileGuid, prompt)?;
    let list_text = read_export(&list.local_path)?;
    let guid_text = read_export(&guid.local_path)?;
    resolve_identities(&list_text, &guid_text, store, user_prefix)
}
