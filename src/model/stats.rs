use crate::scoring::rank::Rank;
use crate::model::account::Subscription;
use crate::model::ctf::ChallengeDifficulty;
use crate::model::lab::{LabDifficulty, ProgressStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct UserStats {
    pub completed_labs: i64,
    pub lab_points: i64,
    pub ctf_points: i64,
    pub total_points: i64,
    pub rank: Rank,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based position in this particular ordering.
    pub position: usize,
    pub user_id: i64,
    pub username: String,
    pub group: String,
    pub avatar_url: Option<String>,
    pub total_points: i64,
    pub solved_count: i64,
    pub rank_title: Rank,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CategoryBreakdown {
    pub category: String,
    pub solved: i64,
    pub total: i64,
    pub total_points_available: i64,
    pub points_earned: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DifficultyBreakdown {
    pub difficulty: ChallengeDifficulty,
    pub solved: i64,
    pub total: i64,
    pub points: i64,
    pub points_earned: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CtfStats {
    pub solved_count: i64,
    pub total_points: i64,
    pub categories_count: i64,
    pub by_category: Vec<CategoryBreakdown>,
    pub by_difficulty: Vec<DifficultyBreakdown>,
}

/// Activity inside the window `(week_start, week_end]`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct WeeklyActivity {
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub labs_completed: i64,
    pub ctf_solved: i64,
    pub points_earned: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SubscriptionCount {
    pub subscription: Subscription,
    pub count: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PlatformOverview {
    pub total_users: i64,
    pub active_users_last_7_days: i64,
    pub total_active_labs: i64,
    pub total_labs_completed: i64,
    pub total_challenges: i64,
    pub total_solves: i64,
    pub subscription_distribution: Vec<SubscriptionCount>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LabDifficultyProgress {
    pub difficulty: LabDifficulty,
    pub labs: i64,
    pub started: i64,
    pub completed: i64,
    pub avg_score: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Lab,
    Ctf,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RecentActivity {
    pub kind: ActivityKind,
    pub title: String,
    pub status: ProgressStatus,
    pub timestamp: DateTime<Utc>,
    pub score: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct UserProgressReport {
    pub lab_progress: Vec<LabDifficultyProgress>,
    pub recent_activity: Vec<RecentActivity>,
    pub weekly_progress: Vec<WeeklyActivity>,
    pub calculated_at: DateTime<Utc>,
}
