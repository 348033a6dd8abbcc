use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use crate::repositories::savings::SavingsLogEntry;

#[derive(Debug, Deserialize, Default)]
pub struct SavingsQuery {
    /// Inclusive start of the date range
    pub from: Option<NaiveDate>,
    /// Inclusive end of the date range
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsResponse {
    pub device_name: String,
    pub entries: Vec<SavingsLogEntry>,
    pub total_saved: f64,
}
