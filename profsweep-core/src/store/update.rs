use crate::check::JobKind;
use crate::domain::{DirSize, EditableState};

/// A single change to the profile store, produced by a job and applied by the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Update {
    Size {
        name: String,
        size: DirSize,
    },
    State {
        name: String,
        state: EditableState,
    },
    /// SID and GUID always travel together.
    Identity {
        name: String,
        sid: Option<String>,
        guid: Option<String>,
    },
    IdentityResolved,
    Removed {
        name: String,
    },
}

/// Output of one job: an ordered list of updates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub kind: JobKind,
    pub updates: Vec<Update>,
    pub cancelled: bool,
}

impl Batch {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            updates: Vec::new(),
            cancelled: false,
        }
    }

    pub fn push(&mut self, u: Update) {
        self.updates.push(u);
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}
