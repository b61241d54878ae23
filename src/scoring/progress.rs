//! Per (user, lab) progress state machine.
//!
//! ```text
//! NotStarted --start--> InProgress --correct flag--> Completed
//!      |                   ^    \--wrong flag--/        |
//!      |--wrong flag-------/                            |
//!      \--correct flag----------------------------------/
//! ```
//!
//! `NotStarted` is the absence of a row. A `Completed` row keeps its status,
//! score and completion time for good: a correct flag resubmitted later is
//! answered from the stored row, a wrong one only bumps `attempts`.

use super::{CoreError, flag, lock_caller, require_user};
use crate::clock::Clock;
use crate::model::lab::{
    Lab, LabDifficulty, LabProgress, LabSubmission, LabView, NewLabProgress, ProgressStatus,
    ProgressView,
};
use crate::store::Store;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct LabFilter {
    pub difficulty: Option<LabDifficulty>,
    pub category: Option<String>,
    pub include_inactive: bool,
}

impl LabFilter {
    fn matches(&self, lab: &Lab) -> bool {
        (self.include_inactive || lab.active)
            && self.difficulty.is_none_or(|d| d == lab.difficulty)
            && self.category.as_deref().is_none_or(|c| c == lab.category)
    }
}

fn require_lab(store: &mut dyn Store, lab_id: i64) -> Result<Lab, CoreError> {
    store.find_lab(lab_id)?.ok_or(CoreError::LabNotFound(lab_id))
}

/// Opens a lab for the user.
pub fn start(
    store: &mut dyn Store,
    clock: &dyn Clock,
    user_id: i64,
    lab_id: i64,
) -> Result<ProgressView, CoreError> {
    lock_caller(store, user_id)?;
    let lab = require_lab(store, lab_id)?;
    if !lab.active {
        return Err(CoreError::LabInactive(lab_id));
    }

    match store.find_progress(user_id, lab_id)? {
        Some(row) if row.status == ProgressStatus::Completed => {
            Err(CoreError::AlreadyCompleted { user_id, lab_id })
        }
        Some(_) => Err(CoreError::AlreadyInProgress { user_id, lab_id }),
        None => {
            let row = store.insert_progress(&NewLabProgress {
                user_id,
                lab_id,
                status: ProgressStatus::InProgress,
                started_at: clock.now(),
                completed_at: None,
                attempts: 0,
                score: 0,
            })?;
            info!("User {} started lab {}", user_id, lab_id);
            Ok(ProgressView::from_row(&lab, &row))
        }
    }
}

/// Checks a flag for a lab and records the attempt.
pub fn submit(
    store: &mut dyn Store,
    clock: &dyn Clock,
    user_id: i64,
    lab_id: i64,
    submitted_flag: &str,
) -> Result<LabSubmission, CoreError> {
    lock_caller(store, user_id)?;
    let lab = require_lab(store, lab_id)?;
    if submitted_flag.is_empty() {
        return Err(CoreError::ValidationFailed("Flag must not be empty.".to_string()));
    }

    let existing = store.find_progress(user_id, lab_id)?;
    let correct = flag::validate(submitted_flag, &lab.flag_hash);

    if let Some(row) = existing.as_ref().filter(|row| row.is_completed()) {
        if correct {
            debug!(
                "Lab {} already completed by user {}; submission not recorded",
                lab_id, user_id
            );
            return Ok(LabSubmission {
                correct,
                points_awarded: row.score,
                already_completed: true,
                progress: ProgressView::from_row(&lab, row),
            });
        }

        let row = store.update_progress(&LabProgress {
            attempts: row.attempts + 1,
            ..row.clone()
        })?;
        debug!(
            "Wrong flag for completed lab {} from user {} (attempt {})",
            lab_id, user_id, row.attempts
        );
        return Ok(LabSubmission {
            correct,
            points_awarded: 0,
            already_completed: true,
            progress: ProgressView::from_row(&lab, &row),
        });
    }

    let now = clock.now();
    let row = match (existing, correct) {
        (Some(row), true) => store.update_progress(&LabProgress {
            status: ProgressStatus::Completed,
            completed_at: Some(now),
            attempts: row.attempts + 1,
            score: lab.points,
            ..row
        })?,
        (Some(row), false) => store.update_progress(&LabProgress {
            attempts: row.attempts + 1,
            ..row
        })?,
        (None, true) => store.insert_progress(&NewLabProgress {
            user_id,
            lab_id,
            status: ProgressStatus::Completed,
            started_at: now,
            completed_at: Some(now),
            attempts: 1,
            score: lab.points,
        })?,
        (None, false) => store.insert_progress(&NewLabProgress {
            user_id,
            lab_id,
            status: ProgressStatus::InProgress,
            started_at: now,
            completed_at: None,
            attempts: 1,
            score: 0,
        })?,
    };

    if correct {
        info!(
            "User {} completed lab {} for {} points after {} attempt(s)",
            user_id, lab_id, lab.points, row.attempts
        );
    } else {
        debug!(
            "Wrong flag for lab {} from user {} (attempt {})",
            lab_id, user_id, row.attempts
        );
    }

    Ok(LabSubmission {
        correct,
        points_awarded: if correct { lab.points } else { 0 },
        already_completed: false,
        progress: ProgressView::from_row(&lab, &row),
    })
}

pub fn progress_of(
    store: &mut dyn Store,
    user_id: i64,
    lab_id: i64,
) -> Result<ProgressView, CoreError> {
    require_user(store, user_id)?;
    let lab = require_lab(store, lab_id)?;
    view_for(store, user_id, &lab)
}

pub fn lab_detail(store: &mut dyn Store, user_id: i64, lab_id: i64) -> Result<LabView, CoreError> {
    require_user(store, user_id)?;
    let lab = require_lab(store, lab_id)?;
    let user_progress = view_for(store, user_id, &lab)?;
    Ok(LabView { lab, user_progress })
}

pub fn list_labs(
    store: &mut dyn Store,
    user_id: i64,
    filter: &LabFilter,
) -> Result<Vec<LabView>, CoreError> {
    require_user(store, user_id)?;
    let rows = store.list_progress(Some(user_id))?;
    let labs = store
        .list_labs()?
        .into_iter()
        .filter(|lab| filter.matches(lab))
        .map(|lab| {
            let user_progress = rows
                .iter()
                .find(|row| row.lab_id == lab.id)
                .map(|row| ProgressView::from_row(&lab, row))
                .unwrap_or_else(|| ProgressView::not_started(&lab));
            LabView { lab, user_progress }
        })
        .collect();
    Ok(labs)
}

fn view_for(store: &mut dyn Store, user_id: i64, lab: &Lab) -> Result<ProgressView, CoreError> {
    Ok(match store.find_progress(user_id, lab.id)? {
        Some(row) => ProgressView::from_row(lab, &row),
        None => ProgressView::not_started(lab),
    })
}
