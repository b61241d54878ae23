use crate::errors::AppError;
use crate::model::UnknownVariant;
use crate::model::account::{Feedback, NewUser, User, UserChanges};
use crate::model::ctf::{CtfChallenge, CtfSolve, NewCtfChallenge, NewCtfSolve};
use crate::model::lab::{Lab, LabProgress, NewLab, NewLabProgress};
use crate::scoring::CoreError;
use deadpool_diesel::postgres::Pool;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use tracing::{debug, error};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(DieselError),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Corrupt row: {0}")]
    CorruptRow(#[from] UnknownVariant),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::UniqueViolation(info.message().to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Row-level access to the platform tables.
///
/// Implementations are expected to be used inside one transaction per core
/// operation; nothing here commits on its own.
pub trait Store {
    /// Row counts per table, used by the health check.
    fn table_counts(&mut self) -> StoreResult<Vec<(&'static str, i64)>>;

    fn find_user(&mut self, user_id: i64) -> StoreResult<Option<User>>;
    /// Like `find_user`, but holds a row lock until the transaction ends.
    fn lock_user(&mut self, user_id: i64) -> StoreResult<Option<User>>;
    fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>>;
    fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
    fn insert_user(&mut self, user: &NewUser) -> StoreResult<User>;
    fn update_user(&mut self, user_id: i64, changes: &UserChanges) -> StoreResult<User>;
    /// All users in registration order.
    fn list_users(&mut self) -> StoreResult<Vec<User>>;

    fn insert_lab(&mut self, lab: &NewLab) -> StoreResult<Lab>;
    fn find_lab(&mut self, lab_id: i64) -> StoreResult<Option<Lab>>;
    fn list_labs(&mut self) -> StoreResult<Vec<Lab>>;

    fn find_progress(&mut self, user_id: i64, lab_id: i64) -> StoreResult<Option<LabProgress>>;
    fn insert_progress(&mut self, row: &NewLabProgress) -> StoreResult<LabProgress>;
    fn update_progress(&mut self, row: &LabProgress) -> StoreResult<LabProgress>;
    /// Progress rows for one user, or for everyone when `user_id` is `None`.
    fn list_progress(&mut self, user_id: Option<i64>) -> StoreResult<Vec<LabProgress>>;

    fn insert_challenge(&mut self, challenge: &NewCtfChallenge) -> StoreResult<CtfChallenge>;
    fn find_challenge(&mut self, challenge_id: i64) -> StoreResult<Option<CtfChallenge>>;
    fn list_challenges(&mut self) -> StoreResult<Vec<CtfChallenge>>;

    fn find_solve(&mut self, user_id: i64, challenge_id: i64) -> StoreResult<Option<CtfSolve>>;
    fn insert_solve(&mut self, solve: &NewCtfSolve) -> StoreResult<CtfSolve>;
    fn count_solves(&mut self, challenge_id: i64) -> StoreResult<i64>;
    fn list_solves(&mut self, user_id: Option<i64>) -> StoreResult<Vec<CtfSolve>>;

    fn insert_feedback(&mut self, feedback: &Feedback) -> StoreResult<Feedback>;
}

/// The backing store the server was started with.
#[derive(Clone)]
pub enum Database {
    Postgres(Pool),
    Memory(MemoryStore),
}

impl Database {
    /// Runs `op` inside a read-write transaction.
    pub async fn write<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut dyn Store) -> Result<T, CoreError> + Send + 'static,
        T: Send + 'static,
    {
        match self {
            Database::Postgres(pool) => {
                let conn = pool.get().await?;
                debug!("DB connection object obtained from pool for write transaction");
                let result = conn
                    .interact(move |conn_sync| {
                        conn_sync
                            .build_transaction()
                            .run::<T, CoreError, _>(|tx_conn| op(tx_conn))
                    })
                    .await?;
                result.map_err(log_failure)
            }
            Database::Memory(store) => store.transaction(op).map_err(log_failure),
        }
    }

    /// Runs `op` inside a read-only transaction that sees a single snapshot.
    pub async fn read<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut dyn Store) -> Result<T, CoreError> + Send + 'static,
        T: Send + 'static,
    {
        match self {
            Database::Postgres(pool) => {
                let conn = pool.get().await?;
                debug!("DB connection object obtained from pool for read transaction");
                let result = conn
                    .interact(move |conn_sync| {
                        conn_sync
                            .build_transaction()
                            .read_only()
                            .repeatable_read()
                            .run::<T, CoreError, _>(|tx_conn| op(tx_conn))
                    })
                    .await?;
                result.map_err(log_failure)
            }
            Database::Memory(store) => store.snapshot(op).map_err(log_failure),
        }
    }
}

fn log_failure(err: CoreError) -> AppError {
    if let CoreError::Store(store_err) = &err {
        error!("Store operation failed: {:?}", store_err);
    }
    AppError::from(err)
}
