use crate::model::stats::{
    CategoryBreakdown, CtfStats, DifficultyBreakdown, LabDifficultyProgress, PlatformOverview,
    RecentActivity, UserProgressReport, UserStats, WeeklyActivity,
};
use crate::payloads::stats::{RecentActivityParams, UserParams, WeeklyActivityParams};
use crate::scoring::stats;
use crate::{AppState, errors::AppError, response::ApiResponse};
use axum::extract::{Query, State};
use tracing::{info, instrument};

/// Returns (wrapped in `ApiResponse`)
/// * `UserStats`: Points from labs and CTF, their sum and the rank (200 OK).
/// * `404 Not Found`: If the user does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn get_user_stats(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<ApiResponse<UserStats>, AppError> {
    info!("Computing stats for user {}", params.user_id);

    let user_stats = state
        .db
        .read(move |store| stats::user_stats(store, params.user_id))
        .await?;

    Ok(ApiResponse::ok(user_stats))
}

#[instrument(skip(state))]
pub async fn get_ctf_stats(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<ApiResponse<CtfStats>, AppError> {
    let ctf_stats = state
        .db
        .read(move |store| stats::ctf_stats(store, params.user_id))
        .await?;

    Ok(ApiResponse::ok(ctf_stats))
}

#[instrument(skip(state))]
pub async fn get_category_breakdown(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<ApiResponse<Vec<CategoryBreakdown>>, AppError> {
    let rows = state
        .db
        .read(move |store| stats::category_breakdown(store, params.user_id))
        .await?;

    Ok(ApiResponse::ok(rows))
}

#[instrument(skip(state))]
pub async fn get_difficulty_breakdown(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<ApiResponse<Vec<DifficultyBreakdown>>, AppError> {
    let rows = state
        .db
        .read(move |store| stats::difficulty_breakdown(store, params.user_id))
        .await?;

    Ok(ApiResponse::ok(rows))
}

/// Trailing 7-day windows, oldest first. `weeks` defaults to 4.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<WeeklyActivity>` (200 OK).
/// * `400 Bad Request`: If `weeks` is outside 1..=52.
/// * `404 Not Found`: If the user does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn get_weekly_activity(
    State(state): State<AppState>,
    Query(params): Query<WeeklyActivityParams>,
) -> Result<ApiResponse<Vec<WeeklyActivity>>, AppError> {
    let weeks = params.weeks.unwrap_or(state.config.weekly_default_weeks);
    info!(
        "Computing {} weeks of activity for user {}",
        weeks, params.user_id
    );

    let clock = state.clock.clone();
    let windows = state
        .db
        .read(move |store| stats::weekly_activity(store, clock.as_ref(), params.user_id, weeks))
        .await?;

    Ok(ApiResponse::ok(windows))
}

#[instrument(skip(state))]
pub async fn get_recent_activity(
    State(state): State<AppState>,
    Query(params): Query<RecentActivityParams>,
) -> Result<ApiResponse<Vec<RecentActivity>>, AppError> {
    let limit = params.limit.unwrap_or(state.config.recent_activity_limit);
    let events = state
        .db
        .read(move |store| stats::recent_activity(store, params.user_id, limit))
        .await?;

    Ok(ApiResponse::ok(events))
}

#[instrument(skip(state))]
pub async fn get_lab_difficulty_progress(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<ApiResponse<Vec<LabDifficultyProgress>>, AppError> {
    let rows = state
        .db
        .read(move |store| stats::lab_difficulty_progress(store, params.user_id))
        .await?;

    Ok(ApiResponse::ok(rows))
}

/// Lab progress by difficulty, recent activity and the default weekly
/// windows, all read from one snapshot.
///
/// Returns (wrapped in `ApiResponse`)
/// * `UserProgressReport` (200 OK).
/// * `404 Not Found`: If the user does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn get_progress_report(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<ApiResponse<UserProgressReport>, AppError> {
    info!("Building progress report for user {}", params.user_id);

    let clock = state.clock.clone();
    let config = state.config.clone();
    let report = state
        .db
        .read(move |store| {
            stats::user_progress_report(store, clock.as_ref(), params.user_id, &config)
        })
        .await?;

    Ok(ApiResponse::ok(report))
}

/// Returns (wrapped in `ApiResponse`)
/// * `PlatformOverview` (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn get_platform_overview(
    State(state): State<AppState>,
) -> Result<ApiResponse<PlatformOverview>, AppError> {
    info!("Computing platform overview");

    let clock = state.clock.clone();
    let window = state.config.active_window_days;
    let overview = state
        .db
        .read(move |store| stats::platform_overview(store, clock.as_ref(), window))
        .await?;

    Ok(ApiResponse::ok(overview))
}
