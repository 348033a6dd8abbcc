use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{map_unique_violation, AppError, Result};

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_name: String,
    #[serde(rename = "group")]
    pub group_name: String,
    #[serde(with = "time_format")]
    pub power_on_time: NaiveTime,
    #[serde(with = "time_format")]
    pub power_off_time: NaiveTime,
    pub count: i32,
    pub consumption_per_hour: f64,
    pub mid_cycle: bool,
    pub suspended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCreate {
    pub device_name: String,
    #[serde(rename = "group")]
    pub group_name: String,
    #[serde(with = "time_format")]
    pub power_on_time: NaiveTime,
    #[serde(with = "time_format")]
    pub power_off_time: NaiveTime,
    #[serde(default = "default_count")]
    pub count: i32,
    pub consumption_per_hour: f64,
}

fn default_count() -> i32 {
    1
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdate {
    #[serde(rename = "group")]
    pub group_name: Option<String>,
    #[serde(default, with = "option_time_format")]
    pub power_on_time: Option<NaiveTime>,
    #[serde(default, with = "option_time_format")]
    pub power_off_time: Option<NaiveTime>,
    pub count: Option<i32>,
    pub consumption_per_hour: Option<f64>,
}

impl DeviceCreate {
    pub fn validate(&self) -> Result<()> {
        if self.device_name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "deviceName must not be empty".to_string(),
            ));
        }
        validate_count(self.count)?;
        validate_consumption(self.consumption_per_hour)
    }
}

impl DeviceUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(count) = self.count {
            validate_count(count)?;
        }
        if let Some(rate) = self.consumption_per_hour {
            validate_consumption(rate)?;
        }
        Ok(())
    }
}

fn validate_count(count: i32) -> Result<()> {
    if count < 1 {
        return Err(AppError::InvalidInput("count must be at least 1".to_string()));
    }
    Ok(())
}

fn validate_consumption(rate: f64) -> Result<()> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(AppError::InvalidInput(
            "consumptionPerHour must be non-negative".to_string(),
        ));
    }
    Ok(())
}

// Custom serde module for NaiveTime ("HH:MM" or "HH:MM:SS")
mod time_format {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

mod option_time_format {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            Some(s) => NaiveTime::parse_from_str(&s, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

const DEVICE_COLUMNS: &str = "device_name, group_name, power_on_time, power_off_time, \
                              count, consumption_per_hour, mid_cycle, suspended_at, \
                              created_at, updated_at";

#[derive(Debug, Clone)]
pub struct DevicesRepository {
    pool: PgPool,
}

impl DevicesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_all(&self) -> Result<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices ORDER BY device_name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(devices)
    }

    pub async fn get_by_name(&self, device_name: &str) -> Result<Device> {
        let device = sqlx::query_as::<_, Device>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE device_name = $1"
        ))
        .bind(device_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device {} not found", device_name)))?;

        Ok(device)
    }

    pub async fn create(&self, create: &DeviceCreate) -> Result<Device> {
        create.validate()?;

        let device = sqlx::query_as::<_, Device>(&format!(
            r#"
            INSERT INTO devices
                (device_name, group_name, power_on_time, power_off_time,
                 count, consumption_per_hour, mid_cycle, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, NOW(), NOW())
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(&create.device_name)
        .bind(&create.group_name)
        .bind(create.power_on_time)
        .bind(create.power_off_time)
        .bind(create.count)
        .bind(create.consumption_per_hour)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                &format!("Device {} already exists", create.device_name),
            )
        })?;

        Ok(device)
    }

    /// Partial update: unsent fields keep their current values. Past ledger
    /// entries are never touched when the consumption rate changes.
    pub async fn update(&self, device_name: &str, update: &DeviceUpdate) -> Result<Device> {
        update.validate()?;

        let device = sqlx::query_as::<_, Device>(&format!(
            r#"
            UPDATE devices SET
                group_name = COALESCE($2, group_name),
                power_on_time = COALESCE($3, power_on_time),
                power_off_time = COALESCE($4, power_off_time),
                count = COALESCE($5, count),
                consumption_per_hour = COALESCE($6, consumption_per_hour),
                updated_at = NOW()
            WHERE device_name = $1
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(device_name)
        .bind(&update.group_name)
        .bind(update.power_on_time)
        .bind(update.power_off_time)
        .bind(update.count)
        .bind(update.consumption_per_hour)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device {} not found", device_name)))?;

        Ok(device)
    }

    /// Delete a device. Its ledger entries are orphaned, not removed.
    pub async fn delete(&self, device_name: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM devices WHERE device_name = $1")
            .bind(device_name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Device {} not found",
                device_name
            )));
        }

        Ok(())
    }

    /// Lock a device row for a sweep transition. Returns None if the row is
    /// gone (deleted between enumeration and locking). The row lock plus the
    /// mid-cycle re-check after locking is what keeps the off-sweep and
    /// on-sweep mutually exclusive per device.
    pub async fn lock_for_transition_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        device_name: &str,
    ) -> Result<Option<Device>> {
        let device = sqlx::query_as::<_, Device>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE device_name = $1 FOR UPDATE"
        ))
        .bind(device_name)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(device)
    }

    /// Mark a device mid-cycle with its off-timestamp (power-off transition).
    pub async fn begin_suspension_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        device_name: &str,
        suspended_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE devices
            SET mid_cycle = TRUE, suspended_at = $2, updated_at = NOW()
            WHERE device_name = $1
            "#,
        )
        .bind(device_name)
        .bind(suspended_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Clear the mid-cycle flag and pending off-timestamp (power-on
    /// transition). Committed together with the ledger append.
    pub async fn complete_suspension_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        device_name: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE devices
            SET mid_cycle = FALSE, suspended_at = NULL, updated_at = NOW()
            WHERE device_name = $1
            "#,
        )
        .bind(device_name)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_create() -> DeviceCreate {
        DeviceCreate {
            device_name: "D1".into(),
            group_name: "office".into(),
            power_on_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            power_off_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            count: 2,
            consumption_per_hour: 0.5,
        }
    }

    #[test]
    fn test_create_validation_accepts_valid_device() {
        assert!(base_create().validate().is_ok());
    }

    #[test]
    fn test_create_validation_rejects_zero_count() {
        let mut create = base_create();
        create.count = 0;
        assert!(matches!(
            create.validate(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_create_validation_rejects_negative_consumption() {
        let mut create = base_create();
        create.consumption_per_hour = -0.1;
        assert!(matches!(
            create.validate(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_create_validation_rejects_empty_name() {
        let mut create = base_create();
        create.device_name = "  ".into();
        assert!(create.validate().is_err());
    }

    #[test]
    fn test_device_create_deserializes_hh_mm_times() {
        let json = r#"{
            "deviceName": "D1",
            "group": "office",
            "powerOnTime": "06:00",
            "powerOffTime": "22:00",
            "consumptionPerHour": 0.5
        }"#;
        let create: DeviceCreate = serde_json::from_str(json).unwrap();
        assert_eq!(create.power_off_time, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(create.count, 1); // default
    }

    #[test]
    fn test_device_create_rejects_bad_time_format() {
        let json = r#"{
            "deviceName": "D1",
            "group": "office",
            "powerOnTime": "25:99",
            "powerOffTime": "22:00",
            "consumptionPerHour": 0.5
        }"#;
        assert!(serde_json::from_str::<DeviceCreate>(json).is_err());
    }

    #[test]
    fn test_device_serializes_times_as_hh_mm() {
        let device = Device {
            device_name: "D1".into(),
            group_name: "office".into(),
            power_on_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            power_off_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            count: 2,
            consumption_per_hour: 0.5,
            mid_cycle: false,
            suspended_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["powerOnTime"], "06:00");
        assert_eq!(json["powerOffTime"], "22:00");
        assert_eq!(json["group"], "office");
        assert_eq!(json["midCycle"], false);
    }

    #[test]
    fn test_device_update_partial_deserialization() {
        let json = r#"{"consumptionPerHour": 1.5}"#;
        let update: DeviceUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.consumption_per_hour, Some(1.5));
        assert!(update.group_name.is_none());
        assert!(update.power_on_time.is_none());
    }
}
