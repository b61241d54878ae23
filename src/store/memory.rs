//! In-process `Store` used for local runs and the test suite.
//!
//! Each operation works on a private copy of the tables while holding the
//! store mutex; the copy replaces the shared tables only if the operation
//! succeeds, so a failed operation leaves nothing behind.
//!
//! Every call clones all tables and operations run one at a time. Fine for
//! tests and demo data, not for production load.

use super::{Store, StoreError, StoreResult};
use crate::model::account::{Feedback, NewUser, User, UserChanges};
use crate::model::ctf::{CtfChallenge, CtfSolve, NewCtfChallenge, NewCtfSolve};
use crate::model::lab::{Lab, LabProgress, NewLab, NewLabProgress};
use crate::scoring::CoreError;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<MemoryTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction<T, F>(&self, op: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut dyn Store) -> Result<T, CoreError>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let out = op(&mut working)?;
        *guard = working;
        Ok(out)
    }

    pub fn snapshot<T, F>(&self, op: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut dyn Store) -> Result<T, CoreError>,
    {
        let guard = self.lock()?;
        let mut working = guard.clone();
        drop(guard);
        op(&mut working)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryTables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".to_string()))
    }
}

#[derive(Clone, Default, Debug)]
pub struct MemoryTables {
    users: Vec<User>,
    labs: Vec<Lab>,
    progress: Vec<LabProgress>,
    challenges: Vec<CtfChallenge>,
    solves: Vec<CtfSolve>,
    feedback: Vec<Feedback>,
    next_id: i64,
}

impl MemoryTables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_mut(&mut self, user_id: i64) -> StoreResult<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::Database(diesel::result::Error::NotFound))
    }

    fn ensure_unique_user(&self, skip_id: Option<i64>, username: &str, email: &str) -> StoreResult<()> {
        let clash = self.users.iter().filter(|u| Some(u.id) != skip_id).find_map(|u| {
            if u.username == username {
                Some("users_username_key")
            } else if u.email == email {
                Some("users_email_key")
            } else {
                None
            }
        });
        match clash {
            Some(constraint) => Err(StoreError::UniqueViolation(format!(
                "duplicate key value violates unique constraint \"{}\"",
                constraint
            ))),
            None => Ok(()),
        }
    }
}

impl Store for MemoryTables {
    fn table_counts(&mut self) -> StoreResult<Vec<(&'static str, i64)>> {
        Ok(vec![
            ("users", self.users.len() as i64),
            ("labs", self.labs.len() as i64),
            ("lab_progress", self.progress.len() as i64),
            ("ctf_challenges", self.challenges.len() as i64),
            ("ctf_solves", self.solves.len() as i64),
        ])
    }

    fn find_user(&mut self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.id == user_id).cloned())
    }

    fn lock_user(&mut self, user_id: i64) -> StoreResult<Option<User>> {
        // the store mutex already serializes writers
        self.find_user(user_id)
    }

    fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.username == username).cloned())
    }

    fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.email == email).cloned())
    }

    fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        self.ensure_unique_user(None, &user.username, &user.email)?;
        let stored = User {
            id: self.next_id(),
            username: user.username.clone(),
            email: user.email.clone(),
            credential_hash: user.credential_hash.clone(),
            group: user.group.clone(),
            subscription: user.subscription,
            role: user.role,
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at,
        };
        self.users.push(stored.clone());
        Ok(stored)
    }

    fn update_user(&mut self, user_id: i64, changes: &UserChanges) -> StoreResult<User> {
        let current = self
            .find_user(user_id)?
            .ok_or(StoreError::Database(diesel::result::Error::NotFound))?;
        let username = changes.username.as_deref().unwrap_or(&current.username);
        let email = changes.email.as_deref().unwrap_or(&current.email);
        self.ensure_unique_user(Some(user_id), username, email)?;

        let user = self.user_mut(user_id)?;
        if let Some(username) = &changes.username {
            user.username = username.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(group) = &changes.group {
            user.group = group.clone();
        }
        if let Some(subscription) = changes.subscription {
            user.subscription = subscription;
        }
        Ok(user.clone())
    }

    fn list_users(&mut self) -> StoreResult<Vec<User>> {
        let mut users = self.users.clone();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    fn insert_lab(&mut self, lab: &NewLab) -> StoreResult<Lab> {
        let stored = Lab {
            id: self.next_id(),
            title: lab.title.clone(),
            description: lab.description.clone(),
            difficulty: lab.difficulty,
            category: lab.category.clone(),
            points: lab.points,
            time_estimate_minutes: lab.time_estimate_minutes,
            flag_hash: lab.flag_hash.clone(),
            active: lab.active,
        };
        self.labs.push(stored.clone());
        Ok(stored)
    }

    fn find_lab(&mut self, lab_id: i64) -> StoreResult<Option<Lab>> {
        Ok(self.labs.iter().find(|l| l.id == lab_id).cloned())
    }

    fn list_labs(&mut self) -> StoreResult<Vec<Lab>> {
        Ok(self.labs.clone())
    }

    fn find_progress(&mut self, user_id: i64, lab_id: i64) -> StoreResult<Option<LabProgress>> {
        Ok(self
            .progress
            .iter()
            .find(|p| p.user_id == user_id && p.lab_id == lab_id)
            .cloned())
    }

    fn insert_progress(&mut self, row: &NewLabProgress) -> StoreResult<LabProgress> {
        if self.find_progress(row.user_id, row.lab_id)?.is_some() {
            return Err(StoreError::UniqueViolation(
                "duplicate key value violates unique constraint \"lab_progress_user_id_lab_id_key\""
                    .to_string(),
            ));
        }
        let stored = LabProgress {
            id: self.next_id(),
            user_id: row.user_id,
            lab_id: row.lab_id,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            attempts: row.attempts,
            score: row.score,
        };
        self.progress.push(stored.clone());
        Ok(stored)
    }

    fn update_progress(&mut self, row: &LabProgress) -> StoreResult<LabProgress> {
        let existing = self
            .progress
            .iter_mut()
            .find(|p| p.id == row.id)
            .ok_or(StoreError::Database(diesel::result::Error::NotFound))?;
        existing.status = row.status;
        existing.completed_at = row.completed_at;
        existing.attempts = row.attempts;
        existing.score = row.score;
        Ok(existing.clone())
    }

    fn list_progress(&mut self, user_id: Option<i64>) -> StoreResult<Vec<LabProgress>> {
        Ok(self
            .progress
            .iter()
            .filter(|p| user_id.is_none_or(|id| p.user_id == id))
            .cloned()
            .collect())
    }

    fn insert_challenge(&mut self, challenge: &NewCtfChallenge) -> StoreResult<CtfChallenge> {
        let stored = CtfChallenge {
            id: self.next_id(),
            title: challenge.title.clone(),
            description: challenge.description.clone(),
            category: challenge.category.clone(),
            difficulty: challenge.difficulty,
            points: challenge.points,
            flag_hash: challenge.flag_hash.clone(),
        };
        self.challenges.push(stored.clone());
        Ok(stored)
    }

    fn find_challenge(&mut self, challenge_id: i64) -> StoreResult<Option<CtfChallenge>> {
        Ok(self.challenges.iter().find(|c| c.id == challenge_id).cloned())
    }

    fn list_challenges(&mut self) -> StoreResult<Vec<CtfChallenge>> {
        Ok(self.challenges.clone())
    }

    fn find_solve(&mut self, user_id: i64, challenge_id: i64) -> StoreResult<Option<CtfSolve>> {
        Ok(self
            .solves
            .iter()
            .find(|s| s.user_id == user_id && s.challenge_id == challenge_id)
            .cloned())
    }

    fn insert_solve(&mut self, solve: &NewCtfSolve) -> StoreResult<CtfSolve> {
        if self.find_solve(solve.user_id, solve.challenge_id)?.is_some() {
            return Err(StoreError::UniqueViolation(
                "duplicate key value violates unique constraint \"ctf_solves_user_id_challenge_id_key\""
                    .to_string(),
            ));
        }
        let stored = CtfSolve {
            id: self.next_id(),
            user_id: solve.user_id,
            challenge_id: solve.challenge_id,
            solved_at: solve.solved_at,
            submitted_flag: solve.submitted_flag.clone(),
        };
        self.solves.push(stored.clone());
        Ok(stored)
    }

    fn count_solves(&mut self, challenge_id: i64) -> StoreResult<i64> {
        Ok(self
            .solves
            .iter()
            .filter(|s| s.challenge_id == challenge_id)
            .count() as i64)
    }

    fn list_solves(&mut self, user_id: Option<i64>) -> StoreResult<Vec<CtfSolve>> {
        Ok(self
            .solves
            .iter()
            .filter(|s| user_id.is_none_or(|id| s.user_id == id))
            .cloned()
            .collect())
    }

    fn insert_feedback(&mut self, feedback: &Feedback) -> StoreResult<Feedback> {
        self.feedback.push(feedback.clone());
        Ok(feedback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::fixtures;

    fn user_count(store: &MemoryStore) -> usize {
        store.snapshot(|s| Ok(s.list_users()?)).unwrap().len()
    }

    #[test]
    fn only_successful_transactions_commit() {
        let store = MemoryStore::new();

        let failed: Result<(), CoreError> = store.transaction(|s| {
            fixtures::student(s, "alice");
            Err(CoreError::ValidationFailed("rolled back".to_string()))
        });
        assert!(failed.is_err());
        assert_eq!(user_count(&store), 0);

        store
            .snapshot(|s| {
                fixtures::student(s, "alice");
                Ok(())
            })
            .unwrap();
        assert_eq!(user_count(&store), 0);

        store
            .transaction(|s| {
                fixtures::student(s, "alice");
                Ok(())
            })
            .unwrap();
        assert_eq!(user_count(&store), 1);
    }
}
