use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::Result;

/// One completed off-to-on cycle. Immutable once written.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavingsLogEntry {
    pub id: i64,
    pub device_name: String,
    pub date: NaiveDate,
    pub hours_off: f64,
    pub energy_saved: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SavingsRepository {
    pool: PgPool,
}

impl SavingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a ledger entry within an existing transaction, so the entry
    /// and the device's mid-cycle flag flip commit or roll back together.
    pub async fn append_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        device_name: &str,
        date: NaiveDate,
        hours_off: f64,
        energy_saved: f64,
    ) -> Result<SavingsLogEntry> {
        let entry = sqlx::query_as::<_, SavingsLogEntry>(
            r#"
            INSERT INTO savings_log (device_name, date, hours_off, energy_saved, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, device_name, date, hours_off, energy_saved, created_at
            "#,
        )
        .bind(device_name)
        .bind(date)
        .bind(hours_off)
        .bind(energy_saved)
        .fetch_one(&mut **tx)
        .await?;

        Ok(entry)
    }

    /// Entries for a device in chronological order, optionally bounded by
    /// an inclusive date range. Works for deleted devices too: entries are
    /// keyed by historical name, not by a live registry row.
    pub async fn find_by_device(
        &self,
        device_name: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<SavingsLogEntry>> {
        let entries = sqlx::query_as::<_, SavingsLogEntry>(
            r#"
            SELECT id, device_name, date, hours_off, energy_saved, created_at
            FROM savings_log
            WHERE device_name = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY created_at, id
            "#,
        )
        .bind(device_name)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn total_saved(&self, device_name: &str) -> Result<f64> {
        let (total,): (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(energy_saved), 0.0) FROM savings_log WHERE device_name = $1",
        )
        .bind(device_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
