//! Per (user, challenge) solve ledger. Append-only: a solve row is written
//! once, on the first correct flag, and never changed afterwards.

use super::{CoreError, flag, lock_caller, require_user};
use crate::clock::Clock;
use crate::model::ctf::{
    ChallengeDifficulty, ChallengeView, CtfChallenge, CtfSubmission, NewCtfSolve,
};
use crate::store::Store;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ChallengeFilter {
    pub category: Option<String>,
    pub difficulty: Option<ChallengeDifficulty>,
}

impl ChallengeFilter {
    fn matches(&self, challenge: &CtfChallenge) -> bool {
        self.category.as_deref().is_none_or(|c| c == challenge.category)
            && self.difficulty.is_none_or(|d| d == challenge.difficulty)
    }
}

fn require_challenge(store: &mut dyn Store, challenge_id: i64) -> Result<CtfChallenge, CoreError> {
    store
        .find_challenge(challenge_id)?
        .ok_or(CoreError::ChallengeNotFound(challenge_id))
}

/// Checks a flag for a challenge. Solved challenges refuse any further
/// submission, right or wrong, before the flag is even looked at.
pub fn submit(
    store: &mut dyn Store,
    clock: &dyn Clock,
    user_id: i64,
    challenge_id: i64,
    submitted_flag: &str,
) -> Result<CtfSubmission, CoreError> {
    lock_caller(store, user_id)?;
    let challenge = require_challenge(store, challenge_id)?;

    if store.find_solve(user_id, challenge_id)?.is_some() {
        return Err(CoreError::AlreadySolved {
            user_id,
            challenge_id,
        });
    }
    if submitted_flag.is_empty() {
        return Err(CoreError::ValidationFailed("Flag must not be empty.".to_string()));
    }

    if !flag::validate(submitted_flag, &challenge.flag_hash) {
        debug!(
            "Wrong flag for challenge {} from user {}",
            challenge_id, user_id
        );
        return Ok(CtfSubmission {
            correct: false,
            points: 0,
            solved_at: None,
        });
    }

    let solve = store.insert_solve(&NewCtfSolve {
        user_id,
        challenge_id,
        solved_at: clock.now(),
        submitted_flag: submitted_flag.to_string(),
    })?;
    info!(
        "User {} solved challenge {} for {} points",
        user_id, challenge_id, challenge.points
    );

    Ok(CtfSubmission {
        correct: true,
        points: challenge.points,
        solved_at: Some(solve.solved_at),
    })
}

pub fn is_solved(store: &mut dyn Store, user_id: i64, challenge_id: i64) -> Result<bool, CoreError> {
    require_user(store, user_id)?;
    require_challenge(store, challenge_id)?;
    Ok(store.find_solve(user_id, challenge_id)?.is_some())
}

pub fn solve_count_of(store: &mut dyn Store, challenge_id: i64) -> Result<i64, CoreError> {
    require_challenge(store, challenge_id)?;
    Ok(store.count_solves(challenge_id)?)
}

pub fn challenge_detail(
    store: &mut dyn Store,
    user_id: i64,
    challenge_id: i64,
) -> Result<ChallengeView, CoreError> {
    require_user(store, user_id)?;
    let challenge = require_challenge(store, challenge_id)?;
    let solve = store.find_solve(user_id, challenge_id)?;
    let solve_count = store.count_solves(challenge_id)?;
    Ok(ChallengeView {
        challenge,
        solved: solve.is_some(),
        solved_at: solve.map(|s| s.solved_at),
        solve_count: Some(solve_count),
    })
}

pub fn list_challenges(
    store: &mut dyn Store,
    user_id: i64,
    filter: &ChallengeFilter,
) -> Result<Vec<ChallengeView>, CoreError> {
    require_user(store, user_id)?;
    let solves = store.list_solves(Some(user_id))?;
    let views = store
        .list_challenges()?
        .into_iter()
        .filter(|c| filter.matches(c))
        .map(|challenge| {
            let solved_at = solves
                .iter()
                .find(|s| s.challenge_id == challenge.id)
                .map(|s| s.solved_at);
            ChallengeView {
                challenge,
                solved: solved_at.is_some(),
                solved_at,
                solve_count: None,
            }
        })
        .collect();
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ErrorKind;
    use crate::scoring::fixtures::{challenge, clock, student, tables};

    #[test]
    fn first_correct_submission_records_one_solve() {
        let mut store = tables();
        let clock = clock();
        let user = student(&mut store, "bob");
        let ch = challenge(&mut store, "web", ChallengeDifficulty::Easy, 50, "CSIB{sqli}");

        let result = submit(&mut store, &clock, user.id, ch.id, "CSIB{sqli}").unwrap();

        assert_eq!(
            result,
            CtfSubmission {
                correct: true,
                points: 50,
                solved_at: Some(clock.now()),
            }
        );
        let solves = store.list_solves(Some(user.id)).unwrap();
        assert_eq!(solves.len(), 1);
        assert_eq!(solves[0].submitted_flag, "CSIB{sqli}");
    }

    #[test]
    fn any_submission_after_solving_is_rejected() {
        let mut store = tables();
        let clock = clock();
        let user = student(&mut store, "bob");
        let ch = challenge(&mut store, "web", ChallengeDifficulty::Easy, 50, "CSIB{sqli}");
        submit(&mut store, &clock, user.id, ch.id, "CSIB{sqli}").unwrap();

        for attempt in ["CSIB{sqli}", "wrong", ""] {
            let err = submit(&mut store, &clock, user.id, ch.id, attempt).unwrap_err();
            assert!(matches!(err, CoreError::AlreadySolved { .. }), "attempt {:?}", attempt);
            assert_eq!(err.kind(), ErrorKind::InvalidState);
        }
        assert_eq!(store.count_solves(ch.id).unwrap(), 1);
    }

    #[test]
    fn wrong_flag_leaves_no_trace() {
        let mut store = tables();
        let clock = clock();
        let user = student(&mut store, "bob");
        let ch = challenge(&mut store, "crypto", ChallengeDifficulty::Hard, 150, "CSIB{rsa}");

        let result = submit(&mut store, &clock, user.id, ch.id, "CSIB{nope}").unwrap();

        assert!(!result.correct);
        assert_eq!(result.points, 0);
        assert!(!is_solved(&mut store, user.id, ch.id).unwrap());
        assert_eq!(solve_count_of(&mut store, ch.id).unwrap(), 0);
    }

    #[test]
    fn unknown_challenge_and_empty_flag() {
        let mut store = tables();
        let clock = clock();
        let user = student(&mut store, "bob");
        let ch = challenge(&mut store, "crypto", ChallengeDifficulty::Easy, 30, "CSIB{caesar}");

        let err = submit(&mut store, &clock, user.id, 404, "x").unwrap_err();
        assert!(matches!(err, CoreError::ChallengeNotFound(404)));

        let err = submit(&mut store, &clock, user.id, ch.id, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }

    #[test]
    fn solve_count_spans_users() {
        let mut store = tables();
        let clock = clock();
        let alice = student(&mut store, "alice");
        let bob = student(&mut store, "bob");
        let ch = challenge(&mut store, "pwn", ChallengeDifficulty::Medium, 120, "CSIB{bof}");

        submit(&mut store, &clock, alice.id, ch.id, "CSIB{bof}").unwrap();
        submit(&mut store, &clock, bob.id, ch.id, "CSIB{bof}").unwrap();

        assert_eq!(solve_count_of(&mut store, ch.id).unwrap(), 2);
        assert!(is_solved(&mut store, alice.id, ch.id).unwrap());

        let detail = challenge_detail(&mut store, alice.id, ch.id).unwrap();
        assert!(detail.solved);
        assert_eq!(detail.solve_count, Some(2));
    }

    #[test]
    fn list_challenges_marks_solved_ones() {
        let mut store = tables();
        let clock = clock();
        let user = student(&mut store, "bob");
        let web = challenge(&mut store, "web", ChallengeDifficulty::Easy, 50, "A");
        let crypto = challenge(&mut store, "crypto", ChallengeDifficulty::Hard, 150, "B");
        submit(&mut store, &clock, user.id, crypto.id, "B").unwrap();

        let all = list_challenges(&mut store, user.id, &ChallengeFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert!(!all.iter().find(|v| v.challenge.id == web.id).unwrap().solved);
        assert!(all.iter().find(|v| v.challenge.id == crypto.id).unwrap().solved);

        let hard = ChallengeFilter {
            difficulty: Some(ChallengeDifficulty::Hard),
            ..ChallengeFilter::default()
        };
        let found = list_challenges(&mut store, user.id, &hard).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].solved_at, Some(clock.now()));
    }
}
