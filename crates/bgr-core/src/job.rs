//! Queueable units of work.

use serde::{Deserialize, Serialize};

use crate::bridge::StorageBridge;
use crate::execution::ExecutionError;

/// Something a queue worker can run against a [`StorageBridge`].
pub trait Job: Send + std::fmt::Debug {
    /// Short label for logs.
    fn name(&self) -> String;

    fn handle(&self, bridge: &StorageBridge) -> Result<(), ExecutionError>;
}

/// Deferred disk-to-disk background removal.
///
/// Holds only the four transfer arguments; handling it is exactly one
/// [`StorageBridge::transfer`] call with no retries or extra logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveBackgroundJob {
    pub input_disk: String,
    pub input_path: String,
    pub output_disk: String,
    pub output_path: String,
}

impl RemoveBackgroundJob {
    pub fn new(
        input_disk: impl Into<String>,
        input_path: impl Into<String>,
        output_disk: impl Into<String>,
        output_path: impl Into<String>,
    ) -> Self {
        Self {
            input_disk: input_disk.into(),
            input_path: input_path.into(),
            output_disk: output_disk.into(),
            output_path: output_path.into(),
        }
    }
}

impl Job for RemoveBackgroundJob {
    fn name(&self) -> String {
        format!(
            "remove-background {}:{} -> {}:{}",
            self.input_disk, self.input_path, self.output_disk, self.output_path
        )
    }

    fn handle(&self, bridge: &StorageBridge) -> Result<(), ExecutionError> {
        bridge.transfer(
            &self.input_disk,
            &self.input_path,
            &self.output_disk,
            &self.output_path,
        )
    }
}
