//! `bg-remover transfer`
use std::sync::Arc;

use anyhow::{Context, Result};
use bgr_core::{
    Config, ExecutionService, LocalQueue, QueueTarget, RemoveBackgroundJob, Reporter,
    StorageBridge,
};

use crate::DiskPath;

/// Disk-to-disk removal, inline or through the local queue.
pub fn transfer(
    config: &Config,
    from: &DiskPath,
    to: &DiskPath,
    queued: bool,
    reporter: &dyn Reporter,
) -> Result<()> {
    let service = ExecutionService::new(&config.binary_path, config.timeout());
    let bridge = StorageBridge::new(service, config.disks(), &config.temp_dir);

    if queued {
        let target = QueueTarget::from(&config.queue);
        reporter.info(&format!("Dispatching to queue {target}"));

        let queue = LocalQueue::spawn(Arc::new(bridge), target)?;
        queue.dispatch(RemoveBackgroundJob::new(
            from.disk.as_str(),
            from.path.as_str(),
            to.disk.as_str(),
            to.path.as_str(),
        ))?;
        for outcome in queue.shutdown()? {
            outcome
                .result
                .with_context(|| format!("Job failed: {}", outcome.job))?;
        }
    } else {
        bridge
            .transfer(&from.disk, &from.path, &to.disk, &to.path)
            .with_context(|| format!("Failed to transfer {from} to {to}"))?;
    }

    reporter.success(&format!("Wrote {to}"));
    Ok(())
}
