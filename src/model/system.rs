use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    /// Empty when the store could not be reached.
    pub tables: Vec<TableCount>,
    pub checked_at: DateTime<Utc>,
}
