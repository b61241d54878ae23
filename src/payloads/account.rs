use crate::model::account::Subscription;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub group: String,
    /// Opaque credential reference issued by the identity provider.
    #[serde(default)]
    pub credential_hash: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GetProfileParams {
    pub user_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct UpdateProfilePayload {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub subscription: Option<Subscription>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubmitFeedbackPayload {
    pub user_id: i64,
    #[serde(default)]
    pub kind: Option<String>,
    pub message: String,
}
