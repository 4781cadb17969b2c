pub mod correlate;
pub mod hex;
pub mod keys;
pub mod parse;

pub use correlate::{Assignment, Correlation, GuidIndex, correlate};
pub use keys::Hive;
pub use parse::{RegistryEntry, parse_export};
