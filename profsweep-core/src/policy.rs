use serde::{Deserialize, Serialize};

pub const DEFAULT_RETRY_CEILING: u32 = 30;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Consecutive export failures tolerated before the caller is asked what to do.
    pub ceiling: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_RETRY_CEILING,
        }
    }
}

impl RetryPolicy {
    /// `failures` counts consecutive failures since the last reset.
    pub fn exhausted(&self, failures: u32) -> bool {
        failures >= self.ceiling
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeletePolicy {
    /// Drop a record from the store even when its directory could not be deleted.
    pub drop_failed_directories: bool,
}
