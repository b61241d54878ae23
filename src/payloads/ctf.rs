use crate::model::ctf::ChallengeDifficulty;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
pub struct ListChallengesParams {
    pub user_id: i64,
    pub category: Option<String>,
    pub difficulty: Option<ChallengeDifficulty>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ChallengeParams {
    pub user_id: i64,
    pub challenge_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubmitCtfFlagPayload {
    pub user_id: i64,
    pub challenge_id: i64,
    pub flag: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct LeaderboardParams {
    pub limit: Option<usize>,
}
