//! In-process job queue.
//!
//! Stands in for an external broker: a single worker thread owns a shared
//! [`StorageBridge`] and drains jobs from a channel in submission order.
//! Each job runs exactly once; failures are recorded, never retried.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::bridge::StorageBridge;
use crate::config::QueueConfig;
use crate::execution::ExecutionError;
use crate::job::Job;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to start worker for queue {0}: {1}")]
    Spawn(QueueTarget, #[source] std::io::Error),

    #[error("Queue {0} is no longer accepting jobs")]
    Closed(QueueTarget),

    #[error("Worker for queue {0} panicked")]
    WorkerPanicked(QueueTarget),
}

/// Connection and queue name a job is dispatched onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTarget {
    pub connection: Option<String>,
    pub name: String,
}

impl From<&QueueConfig> for QueueTarget {
    fn from(config: &QueueConfig) -> Self {
        Self {
            connection: config.connection.clone(),
            name: config.name.clone(),
        }
    }
}

impl fmt::Display for QueueTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.connection {
            Some(conn) => write!(f, "{conn}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Result of one handled job.
#[derive(Debug)]
pub struct JobOutcome {
    pub job: String,
    pub result: Result<(), ExecutionError>,
}

enum QueueEvent {
    Run(Box<dyn Job>),
    Shutdown,
}

/// Handle to the worker thread.
pub struct LocalQueue {
    target: QueueTarget,
    sender: mpsc::Sender<QueueEvent>,
    worker: JoinHandle<Vec<JobOutcome>>,
}

impl fmt::Debug for LocalQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalQueue")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl LocalQueue {
    pub fn spawn(bridge: Arc<StorageBridge>, target: QueueTarget) -> Result<Self, QueueError> {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name(format!("bgr-queue-{}", target.name))
            .spawn(move || run_worker(&bridge, &receiver))
            .map_err(|e| QueueError::Spawn(target.clone(), e))?;

        tracing::debug!(queue = %target, "queue worker started");
        Ok(Self {
            target,
            sender,
            worker,
        })
    }

    pub fn target(&self) -> &QueueTarget {
        &self.target
    }

    /// Enqueue `job`. Returns immediately; the job runs on the worker.
    pub fn dispatch(&self, job: impl Job + 'static) -> Result<(), QueueError> {
        tracing::info!(queue = %self.target, job = %job.name(), "job dispatched");
        self.sender
            .send(QueueEvent::Run(Box::new(job)))
            .map_err(|_| QueueError::Closed(self.target.clone()))
    }

    /// Stop accepting jobs, wait for queued ones to finish, and return
    /// their outcomes in dispatch order.
    pub fn shutdown(self) -> Result<Vec<JobOutcome>, QueueError> {
        // A dead worker has nothing to drain; the join below reports it.
        let _ = self.sender.send(QueueEvent::Shutdown);
        self.worker
            .join()
            .map_err(|_| QueueError::WorkerPanicked(self.target))
    }
}

fn run_worker(bridge: &StorageBridge, receiver: &mpsc::Receiver<QueueEvent>) -> Vec<JobOutcome> {
    let mut outcomes = Vec::new();
    while let Ok(event) = receiver.recv() {
        match event {
            QueueEvent::Run(job) => {
                let name = job.name();
                let result = job.handle(bridge);
                match &result {
                    Ok(()) => tracing::info!(job = %name, "job completed"),
                    Err(e) => tracing::error!(job = %name, error = %e, "job failed"),
                }
                outcomes.push(JobOutcome { job: name, result });
            }
            QueueEvent::Shutdown => break,
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionService;
    use crate::job::RemoveBackgroundJob;
    use crate::storage::{Disk, Disks, MemoryDisk};
    use std::time::Duration;

    #[test]
    fn target_display_includes_connection() {
        let mut config = QueueConfig::default();
        assert_eq!(QueueTarget::from(&config).to_string(), "default");
        config.connection = Some("redis".to_string());
        config.name = "images".to_string();
        assert_eq!(QueueTarget::from(&config).to_string(), "redis/images");
    }

    #[test]
    fn failed_jobs_are_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = StorageBridge::new(
            ExecutionService::new(dir.path().join("missing"), Duration::from_secs(5)),
            Disks::new(),
            dir.path(),
        );
        let queue = LocalQueue::spawn(Arc::new(bridge), QueueTarget::from(&QueueConfig::default())).unwrap();

        queue
            .dispatch(RemoveBackgroundJob::new("mem", "a.jpg", "mem", "a.png"))
            .unwrap();
        let outcomes = queue.shutdown().unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            outcomes[0].result,
            Err(ExecutionError::StorageReadFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn runs_jobs_in_order() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bg-remover");
        std::fs::write(&bin, "#!/bin/sh\ncp \"$2\" \"$4\"\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let disk = Arc::new(MemoryDisk::new());
        disk.put("1.jpg", b"one").unwrap();
        disk.put("2.jpg", b"two").unwrap();
        let mut disks = Disks::new();
        disks.insert_shared("mem", disk.clone());

        let bridge = StorageBridge::new(
            ExecutionService::new(bin, Duration::from_secs(10)),
            disks,
            dir.path().join("tmp"),
        );
        let queue = LocalQueue::spawn(Arc::new(bridge), QueueTarget::from(&QueueConfig::default())).unwrap();

        queue.dispatch(RemoveBackgroundJob::new("mem", "1.jpg", "mem", "1.png")).unwrap();
        queue.dispatch(RemoveBackgroundJob::new("mem", "2.jpg", "mem", "2.png")).unwrap();
        let outcomes = queue.shutdown().unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert!(outcomes[0].job.contains("1.jpg"));
        assert_eq!(disk.get("2.png").unwrap(), b"two");
    }
}
