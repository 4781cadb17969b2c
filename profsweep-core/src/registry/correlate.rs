use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::registry::hex::decode_string;
use crate::registry::keys::{
    PROFILE_GUID, PROFILE_LIST, VALUE_GUID, VALUE_PROFILE_IMAGE_PATH, VALUE_SID_STRING, child_of,
};
use crate::registry::parse::RegistryEntry;
use crate::store::inmem::ProfileStore;

/// SID/GUID pair chosen for one profile during a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub sid: String,
    pub guid: Option<String>,
    /// The GUID hive maps `guid` back to `sid`.
    pub confirmed: bool,
}

/// `{GUID}` -> `SidString` from the profile-guid hive.
///
/// Keys are compared without ASCII case. When a GUID appears twice the first
/// block wins, which is what a front-to-back scan would find.
#[derive(Clone, Debug, Default)]
pub struct GuidIndex {
    by_guid: HashMap<String, String>,
}

impl GuidIndex {
    pub fn build(entries: &[RegistryEntry]) -> Self {
        let mut by_guid: HashMap<String, String> = HashMap::new();
        let mut current: Option<String> = None;
        for e in entries {
            match e {
                RegistryEntry::KeyHeader { path } => {
                    current = child_of(path, PROFILE_GUID).map(|g| g.to_ascii_lowercase());
                }
                RegistryEntry::ValueLine { name, raw_data } => {
                    let Some(guid) = current.as_ref() else {
                        continue;
                    };
                    if !name.eq_ignore_ascii_case(VALUE_SID_STRING) || by_guid.contains_key(guid)
                    {
                        continue;
                    }
                    match decode_string(raw_data) {
                        Ok(sid) => {
                            by_guid.insert(guid.clone(), sid);
                        }
                        Err(e) => warn!(guid = %guid, "unreadable SidString: {e}"),
                    }
                }
            }
        }
        Self { by_guid }
    }

    pub fn len(&self) -> usize {
        self.by_guid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_guid.is_empty()
    }

    pub fn sid_for(&self, guid: &str) -> Option<&str> {
        self.by_guid
            .get(&guid.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// True when `guid` leads back to `sid`.
    pub fn round_trips(&self, guid: &str, sid: &str) -> bool {
        self.sid_for(guid)
            .is_some_and(|found| found.eq_ignore_ascii_case(sid))
    }
}

#[derive(Debug, Default)]
struct SidBlock {
    sid: String,
    image_path: Option<String>,
    guid: Option<String>,
}

/// Result of one correlation pass, keyed by store name.
#[derive(Clone, Debug, Default)]
pub struct Correlation {
    pub assignments: BTreeMap<String, Assignment>,
    pub discarded: usize,
}

/// Walk the profile-list entries and pick a SID/GUID pair per known profile.
///
/// The first pair for an account is taken as is. A later pair for the same
/// account replaces it only when the later pair round-trips through the GUID
/// hive and the current one does not, so the first self-consistent pair wins.
pub fn correlate(
    profile_list: &[RegistryEntry],
    guids: &GuidIndex,
    store: &ProfileStore,
    user_prefix: &str,
) -> Correlation {
    let mut out = Correlation::default();
    let mut current: Option<SidBlock> = None;

    for e in profile_list {
        match e {
            RegistryEntry::KeyHeader { path } => {
                if let Some(block) = current.take() {
                    close_block(block, guids, store, user_prefix, &mut out);
                }
                current = child_of(path, PROFILE_LIST).map(|sid| SidBlock {
                    sid: sid.to_string(),
                    ..Default::default()
                });
            }
            RegistryEntry::ValueLine { name, raw_data } => {
                let Some(block) = current.as_mut() else {
                    continue;
                };
                if name.eq_ignore_ascii_case(VALUE_PROFILE_IMAGE_PATH) {
                    if block.image_path.is_some() {
                        continue;
                    }
                    match decode_string(raw_data) {
                        Ok(p) => block.image_path = Some(p),
                        Err(e) => warn!(sid = %block.sid, "unreadable ProfileImagePath: {e}"),
                    }
                } else if name.eq_ignore_ascii_case(VALUE_GUID) && block.guid.is_none() {
                    match decode_string(raw_data) {
                        Ok(g) => block.guid = Some(g),
                        Err(e) => warn!(sid = %block.sid, "unreadable Guid: {e}"),
                    }
                }
            }
        }
    }
    if let Some(block) = current.take() {
        close_block(block, guids, store, user_prefix, &mut out);
    }
    out
}

fn close_block(
    block: SidBlock,
    guids: &GuidIndex,
    store: &ProfileStore,
    user_prefix: &str,
    out: &mut Correlation,
) {
    let Some(path) = block.image_path else {
        debug!(sid = %block.sid, "no profile path, skipped");
        out.discarded += 1;
        return;
    };
    let Some(account) = account_name(&path, user_prefix) else {
        debug!(sid = %block.sid, path = %path, "profile outside users root, skipped");
        out.discarded += 1;
        return;
    };
    let Some(key) = store.find_key(account) else {
        debug!(sid = %block.sid, account, "no directory for profile, skipped");
        out.discarded += 1;
        return;
    };

    let confirmed = block
        .guid
        .as_deref()
        .is_some_and(|g| guids.round_trips(g, &block.sid));
    let candidate = Assignment {
        sid: block.sid,
        guid: block.guid,
        confirmed,
    };

    match out.assignments.get_mut(key) {
        None => {
            out.assignments.insert(key.to_string(), candidate);
        }
        Some(existing) if candidate.confirmed && !existing.confirmed => {
            debug!(
                account = key,
                old = %existing.sid,
                new = %candidate.sid,
                "replacing unconfirmed identity"
            );
            *existing = candidate;
            out.discarded += 1;
        }
        Some(existing) => {
            warn!(
                account = key,
                kept = %existing.sid,
                dropped = %candidate.sid,
                "duplicate profile entry discarded"
            );
            out.discarded += 1;
        }
    }
}

/// `C:\Users\alice` -> `alice` for prefix `C:\Users\`.
pub fn account_name<'a>(path: &'a str, user_prefix: &str) -> Option<&'a str> {
    let path = path.trim();
    if path.len() <= user_prefix.len() || !path.is_char_boundary(user_prefix.len()) {
        return None;
    }
    let (head, rest) = path.split_at(user_prefix.len());
    if !head.eq_ignore_ascii_case(user_prefix) {
        return None;
    }
    let name = rest.trim_end_matches('\\');
    if name.is_empty() || name.contains('\\') {
        None
    } else {
        Some(name)
    }
}
