use crate::model::ctf::{ChallengeView, CtfSubmission};
use crate::model::stats::LeaderboardEntry;
use crate::payloads::ctf::{
    ChallengeParams, LeaderboardParams, ListChallengesParams, SubmitCtfFlagPayload,
};
use crate::scoring::ledger::{self, ChallengeFilter};
use crate::scoring::stats;
use crate::{AppState, errors::AppError, response::ApiResponse};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use tracing::{debug, info, instrument};

/// Lists CTF challenges with the caller's solve state.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<ChallengeView>` (200 OK).
/// * `404 Not Found`: If the user does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn list_challenges(
    State(state): State<AppState>,
    Query(params): Query<ListChallengesParams>,
) -> Result<ApiResponse<Vec<ChallengeView>>, AppError> {
    info!("Listing challenges for user {}", params.user_id);

    let user_id = params.user_id;
    let filter = ChallengeFilter {
        category: params.category,
        difficulty: params.difficulty,
    };
    let challenges = state
        .db
        .read(move |store| ledger::list_challenges(store, user_id, &filter))
        .await?;

    Ok(ApiResponse::ok(challenges))
}

/// Returns (wrapped in `ApiResponse`)
/// * `ChallengeView` including `solve_count` (200 OK).
/// * `404 Not Found`: If the user or challenge does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn get_challenge(
    State(state): State<AppState>,
    Query(params): Query<ChallengeParams>,
) -> Result<ApiResponse<ChallengeView>, AppError> {
    let challenge = state
        .db
        .read(move |store| ledger::challenge_detail(store, params.user_id, params.challenge_id))
        .await?;

    Ok(ApiResponse::ok(challenge))
}

/// Returns (wrapped in `ApiResponse`)
/// * `bool`: Whether the user has solved the challenge (200 OK).
/// * `404 Not Found`: If the user or challenge does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn is_solved(
    State(state): State<AppState>,
    Query(params): Query<ChallengeParams>,
) -> Result<ApiResponse<bool>, AppError> {
    let solved = state
        .db
        .read(move |store| ledger::is_solved(store, params.user_id, params.challenge_id))
        .await?;

    Ok(ApiResponse::ok(solved))
}

/// Returns (wrapped in `ApiResponse`)
/// * `i64`: Number of distinct users who solved the challenge (200 OK).
/// * `404 Not Found`: If the challenge does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn get_solve_count(
    State(state): State<AppState>,
    Path(challenge_id): Path<i64>,
) -> Result<ApiResponse<i64>, AppError> {
    let count = state
        .db
        .read(move |store| ledger::solve_count_of(store, challenge_id))
        .await?;

    Ok(ApiResponse::ok(count))
}

/// Checks a CTF flag. The first correct flag records the solve; any later
/// submission for the same challenge is refused.
///
/// Request Body: `SubmitCtfFlagPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `CtfSubmission` (200 OK), with `correct: false` for a wrong flag.
/// * `400 Bad Request`: If the flag is empty.
/// * `404 Not Found`: If the user or challenge does not exist.
/// * `409 Conflict`: If the challenge is already solved by this user.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, payload))]
pub async fn submit_flag(
    State(state): State<AppState>,
    Json(payload): Json<SubmitCtfFlagPayload>,
) -> Result<ApiResponse<CtfSubmission>, AppError> {
    info!(
        "User {} submitting flag for challenge {}",
        payload.user_id, payload.challenge_id
    );

    let clock = state.clock.clone();
    let (user_id, challenge_id) = (payload.user_id, payload.challenge_id);
    let result = state
        .db
        .write(move |store| {
            ledger::submit(store, clock.as_ref(), user_id, challenge_id, &payload.flag)
        })
        .await?;

    debug!(
        "Challenge {} submission by user {}: correct={}",
        challenge_id, user_id, result.correct
    );
    Ok(ApiResponse::ok(result))
}

/// Public leaderboard. `limit` defaults to the configured default and is
/// capped at the configured maximum.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<LeaderboardEntry>` (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<ApiResponse<Vec<LeaderboardEntry>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(state.config.leaderboard_default_limit)
        .min(state.config.leaderboard_max_limit);
    info!("Fetching leaderboard (limit {})", limit);

    let entries = state
        .db
        .read(move |store| stats::leaderboard(store, limit))
        .await?;

    Ok(ApiResponse::ok(entries))
}
