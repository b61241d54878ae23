use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownVariant;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LabDifficulty {
    Beginner,
    Intermediate,
    Advanced,
    Ctf,
}

impl LabDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabDifficulty::Beginner => "beginner",
            LabDifficulty::Intermediate => "intermediate",
            LabDifficulty::Advanced => "advanced",
            LabDifficulty::Ctf => "ctf",
        }
    }
}

impl FromStr for LabDifficulty {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(LabDifficulty::Beginner),
            "intermediate" => Ok(LabDifficulty::Intermediate),
            "advanced" => Ok(LabDifficulty::Advanced),
            "ctf" => Ok(LabDifficulty::Ctf),
            other => Err(UnknownVariant::new("lab difficulty", other)),
        }
    }
}

impl fmt::Display for LabDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored progress states. `NotStarted` is never persisted: it is what a
/// missing row means.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
        }
    }
}

impl FromStr for ProgressStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ProgressStatus::InProgress),
            "completed" => Ok(ProgressStatus::Completed),
            other => Err(UnknownVariant::new("progress status", other)),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Lab {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: LabDifficulty,
    pub category: String,
    pub points: i32,
    pub time_estimate_minutes: i32,
    #[serde(skip_serializing, default)]
    pub flag_hash: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewLab {
    pub title: String,
    pub description: String,
    pub difficulty: LabDifficulty,
    pub category: String,
    pub points: i32,
    pub time_estimate_minutes: i32,
    pub flag_hash: String,
    pub active: bool,
}

/// One row per (user, lab) pair.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LabProgress {
    pub id: i64,
    pub user_id: i64,
    pub lab_id: i64,
    pub status: ProgressStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub score: i32,
}

impl LabProgress {
    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }
}

#[derive(Debug, Clone)]
pub struct NewLabProgress {
    pub user_id: i64,
    pub lab_id: i64,
    pub status: ProgressStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub score: i32,
}

/// Progress as reported to clients; a pair without a row reports
/// `NotStarted` with zero attempts and score.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub lab_id: i64,
    pub status: ProgressStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub score: i32,
    pub max_points: i32,
}

impl ProgressView {
    pub fn not_started(lab: &Lab) -> Self {
        ProgressView {
            lab_id: lab.id,
            status: ProgressStatus::NotStarted,
            started_at: None,
            completed_at: None,
            attempts: 0,
            score: 0,
            max_points: lab.points,
        }
    }

    pub fn from_row(lab: &Lab, row: &LabProgress) -> Self {
        ProgressView {
            lab_id: lab.id,
            status: row.status,
            started_at: Some(row.started_at),
            completed_at: row.completed_at,
            attempts: row.attempts,
            score: row.score,
            max_points: lab.points,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LabView {
    #[serde(flatten)]
    pub lab: Lab,
    pub user_progress: ProgressView,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LabSubmission {
    pub correct: bool,
    pub points_awarded: i32,
    /// Set when the lab had already been completed; nothing was changed.
    pub already_completed: bool,
    pub progress: ProgressView,
}
