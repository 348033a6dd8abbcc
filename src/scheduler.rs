//! Scheduler: owns the two periodic sweep jobs and their lifecycle.
//!
//! The power-off and power-on sweeps run on independent cadences, the
//! on-sweep staggered by an initial delay as in the deployed setup. Each job
//! is a sequential tick loop, so ticks of one job never overlap; a tick that
//! falls due while a sweep is still running is dropped, not queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SchedulerConfig;
use crate::controller::{PowerCycleController, Sweep};

pub struct Scheduler {
    controller: Arc<PowerCycleController>,
    config: SchedulerConfig,
}

/// Handle to the running jobs. Dropping it does not stop them; call
/// [`SchedulerHandle::shutdown`] to let the current tick finish and join.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(controller: Arc<PowerCycleController>, config: SchedulerConfig) -> Self {
        Self { controller, config }
    }

    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let off_job = tokio::spawn(sweep_loop(
            self.controller.clone(),
            Sweep::PowerOff,
            Duration::from_secs(self.config.off_sweep_interval_secs),
            Duration::ZERO,
            shutdown_rx.clone(),
        ));
        let on_job = tokio::spawn(sweep_loop(
            self.controller,
            Sweep::PowerOn,
            Duration::from_secs(self.config.on_sweep_interval_secs),
            Duration::from_secs(self.config.on_sweep_delay_secs),
            shutdown_rx,
        ));

        tracing::info!(
            off_interval_secs = self.config.off_sweep_interval_secs,
            on_interval_secs = self.config.on_sweep_interval_secs,
            on_delay_secs = self.config.on_sweep_delay_secs,
            "scheduler started"
        );

        SchedulerHandle {
            shutdown_tx,
            handles: vec![off_job, on_job],
        }
    }
}

impl SchedulerHandle {
    /// Graceful stop: signal both jobs, then wait for any in-flight sweep to
    /// complete. No new tick starts after the signal.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "sweep job ended abnormally");
            }
        }
        tracing::info!("scheduler stopped");
    }
}

async fn sweep_loop(
    controller: Arc<PowerCycleController>,
    sweep: Sweep,
    period: Duration,
    initial_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    if !initial_delay.is_zero() {
        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {}
            _ = shutdown.changed() => return,
        }
    }

    let mut interval = tokio::time::interval(period);
    // A tick that comes due mid-sweep is skipped, not queued
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Consume the immediate first tick so the job starts one period in
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let summary = controller.run_sweep(sweep).await;
                if summary.has_failures() {
                    tracing::warn!(
                        sweep = sweep.as_str(),
                        evaluated = summary.evaluated,
                        transitioned = summary.transitioned,
                        failed = summary.errors.len(),
                        "sweep completed with failures"
                    );
                } else {
                    tracing::debug!(
                        sweep = sweep.as_str(),
                        evaluated = summary.evaluated,
                        transitioned = summary.transitioned,
                        "sweep completed"
                    );
                }
            }
            _ = shutdown.changed() => {
                tracing::info!(sweep = sweep.as_str(), "sweep job shutting down");
                break;
            }
        }
    }
}
