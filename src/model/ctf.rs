use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownVariant;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeDifficulty {
    Easy,
    Medium,
    Hard,
}

impl ChallengeDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeDifficulty::Easy => "easy",
            ChallengeDifficulty::Medium => "medium",
            ChallengeDifficulty::Hard => "hard",
        }
    }
}

impl FromStr for ChallengeDifficulty {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(ChallengeDifficulty::Easy),
            "medium" => Ok(ChallengeDifficulty::Medium),
            "hard" => Ok(ChallengeDifficulty::Hard),
            other => Err(UnknownVariant::new("challenge difficulty", other)),
        }
    }
}

impl fmt::Display for ChallengeDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CtfChallenge {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: ChallengeDifficulty,
    pub points: i32,
    #[serde(skip_serializing, default)]
    pub flag_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewCtfChallenge {
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: ChallengeDifficulty,
    pub points: i32,
    pub flag_hash: String,
}

/// Existence of a solve row is what "solved" means.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CtfSolve {
    pub id: i64,
    pub user_id: i64,
    pub challenge_id: i64,
    pub solved_at: DateTime<Utc>,
    pub submitted_flag: String,
}

#[derive(Debug, Clone)]
pub struct NewCtfSolve {
    pub user_id: i64,
    pub challenge_id: i64,
    pub solved_at: DateTime<Utc>,
    pub submitted_flag: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChallengeView {
    #[serde(flatten)]
    pub challenge: CtfChallenge,
    pub solved: bool,
    pub solved_at: Option<DateTime<Utc>>,
    /// Only filled in for single-challenge lookups.
    pub solve_count: Option<i64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CtfSubmission {
    pub correct: bool,
    pub points: i32,
    pub solved_at: Option<DateTime<Utc>>,
}
