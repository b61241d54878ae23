use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Subscription {
    Free,
    Premium,
}

impl Subscription {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subscription::Free => "free",
            Subscription::Premium => "premium",
        }
    }
}

impl FromStr for Subscription {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Subscription::Free),
            "premium" => Ok(Subscription::Premium),
            other => Err(UnknownVariant::new("subscription", other)),
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered platform user. Point totals are never stored here; they are
/// always derived from the lab and CTF ledgers.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub credential_hash: Option<String>,
    pub group: String,
    pub subscription: Subscription,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub credential_hash: Option<String>,
    pub group: String,
    pub subscription: Subscription,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// Builds a fresh student account, rejecting blank identity fields.
    pub fn student(
        username: &str,
        email: &str,
        group: &str,
        credential_hash: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, String> {
        let username = username.trim();
        let email = email.trim();
        let group = group.trim();

        if username.is_empty() {
            return Err("Username must not be empty.".to_string());
        }
        if !email.contains('@') {
            return Err(format!("'{}' is not a valid email address.", email));
        }
        if group.is_empty() {
            return Err("Group must not be empty.".to_string());
        }

        Ok(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            credential_hash,
            group: group.to_string(),
            subscription: Subscription::Free,
            role: Role::Student,
            avatar_url: Some(default_avatar_url(username)),
            created_at,
        })
    }
}

pub fn default_avatar_url(username: &str) -> String {
    format!("https://robohash.org/{}.png?set=set4", username)
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub group: Option<String>,
    pub subscription: Option<Subscription>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.group.is_none()
            && self.subscription.is_none()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: i64,
    pub kind: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ProfileResponse {
    pub user: User,
    pub stats: super::stats::UserStats,
}
