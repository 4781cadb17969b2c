use thiserror::Error;

/// Why a registry export could not be turned into entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("registry export is empty")]
    Empty,

    #[error("registry export is unreadable: none of {lines} lines were recognized")]
    Unrecognized { lines: usize },

    #[error("malformed value data: {0}")]
    BadValue(String),
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("not initialized: {0}")]
    NotInitialized(String),

    #[error("profile does not exist: {0}")]
    DoesNotExist(String),

    #[error("cannot edit: {0}")]
    CannotEdit(String),

    #[error("non-numeric size result: {0}")]
    NonNumeric(String),

    #[error("unrecoverable local failure: {0}")]
    Unrecoverable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("remote {op} failed: {detail}")]
    Remote { op: &'static str, detail: String },

    #[error("remote {op} timed out after {secs}s")]
    Timeout { op: &'static str, secs: u64 },

    #[error("export of {key} abandoned after {attempts} attempts")]
    ExportFailed { key: String, attempts: u32 },

    #[error("copy of {from} failed: {detail}")]
    CopyFailed { from: String, detail: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("pipeline busy: a job is still in flight")]
    Busy,
}

impl ProfileError {
    pub fn remote(op: &'static str, detail: impl Into<String>) -> Self {
        ProfileError::Remote {
            op,
            detail: detail.into(),
        }
    }

    /// True when the failure says the remote target itself is unusable,
    /// as opposed to a condition of a single profile.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProfileError::Remote { .. }
                | ProfileError::Timeout { .. }
                | ProfileError::ExportFailed { .. }
                | ProfileError::Io(_)
        )
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, ProfileError>;
