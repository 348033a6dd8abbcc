//! Power-cycle controller: drives device state transitions and ledger writes.
//!
//! Each sweep enumerates the registry, asks the evaluator for a decision per
//! device, and applies the matching transition inside its own transaction.
//! The ledger append and the mid-cycle flag flip commit or roll back
//! together, so a failed append leaves the pending off-duration intact and
//! the device is retried on the next matching tick.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::evaluator::{evaluate, Transition};
use crate::repositories::{devices::DevicesRepository, savings::SavingsRepository};

/// Which of the two periodic jobs is running. The off-sweep only applies
/// power-off transitions and the on-sweep only power-on transitions; the
/// evaluator decision for the other job's transition is left for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    PowerOff,
    PowerOn,
}

impl Sweep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sweep::PowerOff => "power-off",
            Sweep::PowerOn => "power-on",
        }
    }
}

#[derive(Debug)]
pub struct SweepError {
    pub device_name: String,
    pub error: AppError,
}

/// Outcome of one sweep. Errors are aggregated here and logged; they are
/// never propagated to a caller.
#[derive(Debug, Default)]
pub struct SweepSummary {
    pub evaluated: usize,
    pub transitioned: usize,
    pub errors: Vec<SweepError>,
}

impl SweepSummary {
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Fractional hours between two instants, clamped at zero.
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let seconds = (to - from).num_milliseconds() as f64 / 1000.0;
    (seconds / 3600.0).max(0.0)
}

pub fn energy_saved(hours_off: f64, consumption_per_hour: f64, count: i32) -> f64 {
    hours_off * consumption_per_hour * count as f64
}

pub struct PowerCycleController {
    pool: PgPool,
    devices: DevicesRepository,
    retry_backoff: Duration,
}

impl PowerCycleController {
    pub fn new(pool: PgPool, retry_backoff: Duration) -> Self {
        let devices = DevicesRepository::new(pool.clone());
        Self {
            pool,
            devices,
            retry_backoff,
        }
    }

    /// Run one sweep against the current wall clock.
    pub async fn run_sweep(&self, sweep: Sweep) -> SweepSummary {
        let now = Utc::now();
        let local_now = chrono::Local::now().naive_local();
        self.run_sweep_at(sweep, now, local_now).await
    }

    /// Run one sweep with injected timestamps. `now` is the instant used for
    /// elapsed-time math; `local_now` is the wall clock the schedule is
    /// matched against and supplies the ledger entry's calendar date.
    pub async fn run_sweep_at(
        &self,
        sweep: Sweep,
        now: DateTime<Utc>,
        local_now: NaiveDateTime,
    ) -> SweepSummary {
        let mut summary = SweepSummary::default();

        let devices = match self.devices.get_all().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::error!(sweep = sweep.as_str(), error = %e, "failed to enumerate devices");
                summary.errors.push(SweepError {
                    device_name: "<registry>".to_string(),
                    error: e,
                });
                return summary;
            }
        };

        for device in devices {
            summary.evaluated += 1;

            let decision = evaluate(
                local_now.time(),
                device.power_on_time,
                device.power_off_time,
                device.mid_cycle,
            );

            let result = match (decision, sweep) {
                (Transition::PowerOff, Sweep::PowerOff) => {
                    self.with_retry(|| self.transition_off(&device.device_name, now))
                        .await
                }
                (Transition::PowerOn, Sweep::PowerOn) => {
                    self.with_retry(|| {
                        self.transition_on(&device.device_name, now, local_now.date())
                    })
                    .await
                }
                // NoAction, or a transition the other sweep job owns
                _ => Ok(false),
            };

            match result {
                Ok(true) => summary.transitioned += 1,
                Ok(false) => {}
                Err(e) => {
                    // One device's failure never aborts the rest of the sweep
                    tracing::warn!(
                        sweep = sweep.as_str(),
                        device = %device.device_name,
                        error = %e,
                        "device transition failed"
                    );
                    summary.errors.push(SweepError {
                        device_name: device.device_name.clone(),
                        error: e,
                    });
                }
            }
        }

        summary
    }

    /// Retry an operation once with backoff if the failure looks transient.
    async fn with_retry<F, Fut>(&self, op: F) -> Result<bool>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<bool>>,
    {
        match op().await {
            Err(e) if e.is_transient() => {
                tracing::debug!(error = %e, "transient storage error, retrying once");
                tokio::time::sleep(self.retry_backoff).await;
                op().await
            }
            other => other,
        }
    }

    /// Power-off transition: mark the device mid-cycle and record its
    /// off-timestamp. Returns false when the device was already mid-cycle
    /// (repeat tick within the hour) or deleted meanwhile.
    async fn transition_off(&self, device_name: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let Some(device) = DevicesRepository::lock_for_transition_in_tx(&mut tx, device_name).await?
        else {
            tx.rollback().await?;
            return Ok(false);
        };

        // Re-check under the row lock: a concurrent sweep may have acted first
        if device.mid_cycle {
            tx.rollback().await?;
            return Ok(false);
        }

        DevicesRepository::begin_suspension_in_tx(&mut tx, device_name, now).await?;
        tx.commit().await?;

        tracing::info!(device = %device_name, "device suspended for savings window");
        Ok(true)
    }

    /// Power-on transition: compute the elapsed off-duration, append the
    /// ledger entry and clear the mid-cycle flag atomically.
    async fn transition_on(
        &self,
        device_name: &str,
        now: DateTime<Utc>,
        date: chrono::NaiveDate,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let Some(device) = DevicesRepository::lock_for_transition_in_tx(&mut tx, device_name).await?
        else {
            tx.rollback().await?;
            return Ok(false);
        };

        if !device.mid_cycle {
            tx.rollback().await?;
            return Ok(false);
        }

        let suspended_at = device.suspended_at.ok_or_else(|| {
            AppError::Internal(format!(
                "device {} is mid-cycle with no suspension timestamp",
                device_name
            ))
        })?;

        let hours_off = hours_between(suspended_at, now);
        let saved = energy_saved(hours_off, device.consumption_per_hour, device.count);

        DevicesRepository::complete_suspension_in_tx(&mut tx, device_name).await?;
        let entry =
            SavingsRepository::append_in_tx(&mut tx, device_name, date, hours_off, saved).await?;
        tx.commit().await?;

        tracing::info!(
            device = %device_name,
            hours_off = entry.hours_off,
            energy_saved = entry.energy_saved,
            "savings cycle completed"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_hours_between_full_night() {
        let off = Utc.with_ymd_and_hms(2025, 7, 17, 22, 0, 0).unwrap();
        let on = Utc.with_ymd_and_hms(2025, 7, 18, 6, 0, 0).unwrap();
        assert_eq!(hours_between(off, on), 8.0);
    }

    #[test]
    fn test_hours_between_fractional() {
        let off = Utc.with_ymd_and_hms(2025, 7, 17, 22, 0, 0).unwrap();
        let on = Utc.with_ymd_and_hms(2025, 7, 17, 23, 30, 0).unwrap();
        assert!((hours_between(off, on) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_hours_between_clamps_negative() {
        let off = Utc.with_ymd_and_hms(2025, 7, 18, 6, 0, 0).unwrap();
        let on = Utc.with_ymd_and_hms(2025, 7, 17, 22, 0, 0).unwrap();
        assert_eq!(hours_between(off, on), 0.0);
    }

    #[test]
    fn test_energy_saved_formula() {
        // D1: 8 hours off, 0.5 kWh per unit-hour, 2 units
        assert!((energy_saved(8.0, 0.5, 2) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_energy_saved_zero_rate() {
        assert_eq!(energy_saved(10.0, 0.0, 5), 0.0);
    }

    #[test]
    fn test_sweep_summary_failures() {
        let mut summary = SweepSummary::default();
        assert!(!summary.has_failures());
        summary.errors.push(SweepError {
            device_name: "D1".into(),
            error: AppError::Internal("boom".into()),
        });
        assert!(summary.has_failures());
    }

    #[test]
    fn test_sweep_names() {
        assert_eq!(Sweep::PowerOff.as_str(), "power-off");
        assert_eq!(Sweep::PowerOn.as_str(), "power-on");
    }
}
