//! Progress and scoring rules.
//!
//! Every operation here is synchronous and works against a [`Store`] handle
//! that the caller has already opened inside a transaction. Time comes from an
//! injected [`Clock`](crate::clock::Clock) so the rules can be exercised
//! against a fixed instant.
//!
//! [`Store`]: crate::store::Store

use crate::model::UnknownVariant;
use crate::store::StoreError;
use thiserror::Error;

pub mod account;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod flag;
pub mod ledger;
pub mod progress;
pub mod rank;
pub mod stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    ValidationFailed,
    StoreFailure,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("User with ID {0} not found.")]
    UserNotFound(i64),

    #[error("Lab with ID {0} not found.")]
    LabNotFound(i64),

    #[error("Challenge with ID {0} not found.")]
    ChallengeNotFound(i64),

    #[error("Lab with ID {0} is not active.")]
    LabInactive(i64),

    #[error("Lab {lab_id} is already in progress for user {user_id}.")]
    AlreadyInProgress { user_id: i64, lab_id: i64 },

    #[error("Lab {lab_id} has already been completed by user {user_id}.")]
    AlreadyCompleted { user_id: i64, lab_id: i64 },

    #[error("Challenge {challenge_id} has already been solved by user {user_id}.")]
    AlreadySolved { user_id: i64, challenge_id: i64 },

    #[error("Username '{0}' is already taken.")]
    UsernameTaken(String),

    #[error("Email '{0}' is already in use.")]
    EmailTaken(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::UserNotFound(_)
            | CoreError::LabNotFound(_)
            | CoreError::ChallengeNotFound(_) => ErrorKind::NotFound,
            CoreError::LabInactive(_)
            | CoreError::AlreadyInProgress { .. }
            | CoreError::AlreadyCompleted { .. }
            | CoreError::AlreadySolved { .. }
            | CoreError::UsernameTaken(_)
            | CoreError::EmailTaken(_) => ErrorKind::InvalidState,
            CoreError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            CoreError::Store(StoreError::UniqueViolation(_)) => ErrorKind::InvalidState,
            CoreError::Store(_) => ErrorKind::StoreFailure,
        }
    }
}

impl From<diesel::result::Error> for CoreError {
    fn from(err: diesel::result::Error) -> Self {
        CoreError::Store(StoreError::from(err))
    }
}

impl From<UnknownVariant> for CoreError {
    fn from(err: UnknownVariant) -> Self {
        CoreError::Store(StoreError::CorruptRow(err))
    }
}

/// Tunables shared by the aggregation queries.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub leaderboard_default_limit: usize,
    pub leaderboard_max_limit: usize,
    pub active_window_days: i64,
    pub weekly_default_weeks: u32,
    pub recent_activity_limit: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            leaderboard_default_limit: 50,
            leaderboard_max_limit: 50,
            active_window_days: 7,
            weekly_default_weeks: 4,
            recent_activity_limit: 10,
        }
    }
}

/// Loads the caller and holds it for the rest of the transaction.
///
/// Write paths go through here first so that two requests from the same user
/// cannot interleave their check-then-write steps.
pub(crate) fn lock_caller(
    store: &mut dyn crate::store::Store,
    user_id: i64,
) -> Result<crate::model::account::User, CoreError> {
    store
        .lock_user(user_id)?
        .ok_or(CoreError::UserNotFound(user_id))
}

pub(crate) fn require_user(
    store: &mut dyn crate::store::Store,
    user_id: i64,
) -> Result<crate::model::account::User, CoreError> {
    store
        .find_user(user_id)?
        .ok_or(CoreError::UserNotFound(user_id))
}
