use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

pub type SweepCallback = Arc<dyn Fn() + Send + Sync>;

/// Register the cron-driven sweeps and start the scheduler. Every spec gets
/// its own job; they all funnel into the same callback, so overlapping crons
/// collapse into whatever the sweep queue holds.
pub async fn configure_sweep_jobs(
    cron_specs: &[String],
    callback: SweepCallback,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    for spec in cron_specs {
        scheduler.add(sweep_job(spec, callback.clone())?).await?;
        tracing::debug!(target: "scheduler", cron = %spec, "sweep registered");
    }
    scheduler.start().await?;
    tracing::info!(target: "scheduler", jobs = cron_specs.len(), "sweep schedule active");
    Ok(scheduler)
}

fn sweep_job(spec: &str, callback: SweepCallback) -> Result<Job> {
    let label = spec.to_string();
    let job = Job::new_async(spec, move |_id, _scheduler| {
        let callback = callback.clone();
        let cron = label.clone();
        Box::pin(async move {
            tracing::info!(target: "scheduler", cron = %cron, "sweep triggered");
            callback();
        })
    })?;
    Ok(job)
}
