use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
pub struct UserParams {
    pub user_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct WeeklyActivityParams {
    pub user_id: i64,
    pub weeks: Option<u32>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct RecentActivityParams {
    pub user_id: i64,
    pub limit: Option<usize>,
}
