use std::collections::BTreeMap;

use crate::domain::{EditableState, ProfileRecord, RemoteDir, is_public};
use crate::error::{ProfileError, Result};
use crate::store::update::Update;

/// Directory name -> profile metadata for one session.
#[derive(Clone, Debug, Default)]
pub struct ProfileStore {
    pub by_name: BTreeMap<String, ProfileRecord>,
    identity_resolved: bool,
}

impl ProfileStore {
    /// Build from a directory listing. Later duplicates of a name are ignored.
    pub fn from_listing<I>(dirs: I) -> Self
    where
        I: IntoIterator<Item = RemoteDir>,
    {
        let mut by_name = BTreeMap::new();
        for d in dirs {
            by_name
                .entry(d.name.clone())
                .or_insert_with(|| ProfileRecord::from(d));
        }
        Self {
            by_name,
            identity_resolved: false,
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ProfileRecord> {
        self.by_name.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &ProfileRecord> + '_ {
        self.by_name.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    /// Store key matching `account`, ignoring ASCII case.
    pub fn find_key(&self, account: &str) -> Option<&str> {
        if let Some((k, _)) = self.by_name.get_key_value(account) {
            return Some(k.as_str());
        }
        self.by_name
            .keys()
            .find(|k| k.eq_ignore_ascii_case(account))
            .map(|k| k.as_str())
    }

    pub fn identity_resolved(&self) -> bool {
        self.identity_resolved
    }

    pub fn marked(&self) -> impl Iterator<Item = &ProfileRecord> + '_ {
        self.by_name.values().filter(|r| r.marked_for_delete)
    }

    /// Flag or unflag a profile for deletion. The store is untouched on error.
    pub fn mark(&mut self, name: &str, marked: bool) -> Result<()> {
        if is_public(name) {
            return Err(ProfileError::CannotEdit(format!(
                "{name} is a protected account"
            )));
        }
        let rec = self
            .by_name
            .get_mut(name)
            .ok_or_else(|| ProfileError::DoesNotExist(name.to_string()))?;
        if marked && rec.editable == EditableState::Uneditable {
            return Err(ProfileError::CannotEdit(format!(
                "{name} is in use on the target"
            )));
        }
        rec.marked_for_delete = marked;
        Ok(())
    }

    /// Apply one update. Updates naming a record that is gone are dropped.
    pub fn apply(&mut self, u: &Update) -> bool {
        match u {
            Update::Size { name, size } => match self.by_name.get_mut(name) {
                Some(r) => {
                    r.size = *size;
                    true
                }
                None => false,
            },
            Update::State { name, state } => match self.by_name.get_mut(name) {
                Some(r) => {
                    r.editable = *state;
                    if *state == EditableState::Uneditable {
                        r.marked_for_delete = false;
                    }
                    if r.is_public() {
                        r.marked_for_delete = false;
                    }
                    true
                }
                None => false,
            },
            Update::Identity { name, sid, guid } => match self.by_name.get_mut(name) {
                Some(r) => {
                    r.sid = sid.clone();
                    r.guid = guid.clone();
                    true
                }
                None => false,
            },
            Update::IdentityResolved => {
                self.identity_resolved = true;
                true
            }
            Update::Removed { name } => self.by_name.remove(name).is_some(),
        }
    }
}
