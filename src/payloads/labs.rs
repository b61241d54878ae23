use crate::model::lab::LabDifficulty;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
pub struct ListLabsParams {
    pub user_id: i64,
    pub difficulty: Option<LabDifficulty>,
    pub category: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct LabParams {
    pub user_id: i64,
    pub lab_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct StartLabPayload {
    pub user_id: i64,
    pub lab_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubmitLabFlagPayload {
    pub user_id: i64,
    pub lab_id: i64,
    pub flag: String,
}
