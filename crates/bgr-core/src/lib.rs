pub mod bridge;
pub mod config;
pub mod execution;
pub mod installer;
pub mod io;
pub mod job;
pub mod paths;
pub mod platform;
pub mod queue;
pub mod release;
pub mod reporter;
pub mod storage;

pub use bridge::{StagingArea, StorageBridge};
pub use config::Config;
pub use execution::{CapturedOutput, ExecutionError, ExecutionRequest, ExecutionService};
pub use installer::{BinaryInstaller, InstallError, InstallReport, InstallSettings};
pub use job::{Job, RemoveBackgroundJob};
pub use paths::*;
pub use platform::PlatformResolver;
pub use queue::{JobOutcome, LocalQueue, QueueError, QueueTarget};
pub use release::{GitHubReleases, ReleaseDescriptor, ReleaseSource};
pub use reporter::{NullReporter, Reporter};
pub use storage::{Disk, Disks, LocalDisk, MemoryDisk, StorageError};

/// User Agent string for release lookups and downloads
pub const USER_AGENT: &str = concat!("bgr-core/", env!("CARGO_PKG_VERSION"));
