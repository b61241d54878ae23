use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse title derived from a user's total points.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Novice,
    Intermediate,
    Advanced,
    Professional,
    Expert,
    Elite,
}

// Highest threshold first; the first one reached wins.
const THRESHOLDS: [(i64, Rank); 5] = [
    (2000, Rank::Elite),
    (1500, Rank::Expert),
    (1000, Rank::Professional),
    (500, Rank::Advanced),
    (100, Rank::Intermediate),
];

pub fn rank_of(points: i64) -> Rank {
    THRESHOLDS
        .iter()
        .find(|(threshold, _)| points >= *threshold)
        .map(|(_, rank)| *rank)
        .unwrap_or(Rank::Novice)
}

impl Rank {
    pub fn title(&self) -> &'static str {
        match self {
            Rank::Novice => "Novice",
            Rank::Intermediate => "Intermediate",
            Rank::Advanced => "Advanced",
            Rank::Professional => "Professional",
            Rank::Expert => "Expert",
            Rank::Elite => "Elite",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}
