#![forbid(unsafe_code)]

pub mod error;
pub mod policy;

pub mod util {
    pub mod digest;
}

pub mod config;
pub mod domain;

pub mod store;

pub mod registry;

pub mod host;
pub mod host_factory;

pub mod backup;
pub mod check;
pub mod delete;

pub mod session;
pub mod worker;

pub mod view;

// Re-exports: stable API surface
pub use backup::{AbortOnExhaustion, Acquisition, Remediation, RemediationPrompt, WorkDirs};
pub use check::{CancelToken, JobKind};
pub use config::Settings;
pub use delete::{DeletionReport, DeletionRow, Outcome, delete_marked};
pub use domain::{DirSize, EditableState, ProfileRecord, RemoteDir};
pub use error::{ParseError, ProfileError, Result};
pub use host::{HostParams, ProbeResult, RemoteHost};
pub use host_factory::{Backend, open_host};
pub use policy::{DeletePolicy, RetryPolicy};
pub use registry::RegistryEntry;
pub use session::{Session, StoreEvent};
pub use store::{Batch, ProfileStore, Update};
pub use worker::{Job, JobHandle, JobOutcome};
