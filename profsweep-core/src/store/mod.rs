pub mod inmem;
pub mod update;

pub use inmem::ProfileStore;
pub use update::{Batch, Update};
