// profsweep_core/src/domain.rs

/// The profile that ships with every machine and is never removed.
pub const PUBLIC_PROFILE: &str = "Public";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditableState {
    #[default]
    Unknown,
    Editable,
    Uneditable,
}

/// Result of the size check for one directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DirSize {
    /// The size check has not run yet. Distinct from `Bytes(0)`.
    #[default]
    NotChecked,
    Bytes(u64),
    CouldNotCalculate,
}

impl DirSize {
    pub fn bytes(&self) -> Option<u64> {
        match self {
            DirSize::Bytes(n) => Some(*n),
            _ => None,
        }
    }
}

/// One entry of a remote directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteDir {
    pub name: String,
    pub last_updated: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileRecord {
    pub name: String,
    pub last_updated: String,
    pub size: DirSize,
    pub editable: EditableState,
    pub sid: Option<String>,
    pub guid: Option<String>,
    pub marked_for_delete: bool,
}

impl ProfileRecord {
    pub fn new(name: impl Into<String>, last_updated: impl Into<String>) -> Self {
        let name = name.into();
        let marked_for_delete = !is_public(&name);
        Self {
            name,
            last_updated: last_updated.into(),
            size: DirSize::NotChecked,
            editable: EditableState::Unknown,
            sid: None,
            guid: None,
            marked_for_delete,
        }
    }

    pub fn is_public(&self) -> bool {
        is_public(&self.name)
    }
}

impl From<RemoteDir> for ProfileRecord {
    fn from(d: RemoteDir) -> Self {
        ProfileRecord::new(d.name, d.last_updated)
    }
}

pub fn is_public(name: &str) -> bool {
    name.eq_ignore_ascii_case(PUBLIC_PROFILE)
}
