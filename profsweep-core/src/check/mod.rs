use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod registry;
pub mod size;
pub mod state;

pub use registry::{registry_check, resolve_identities};
pub use size::size_check;
pub use state::state_check;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    Size,
    State,
    Registry,
    Delete,
}

/// Cooperative cancellation, observed between records.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
