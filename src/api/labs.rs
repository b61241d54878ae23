use crate::model::lab::{LabSubmission, LabView, ProgressView};
use crate::payloads::labs::{LabParams, ListLabsParams, StartLabPayload, SubmitLabFlagPayload};
use crate::scoring::progress::{self, LabFilter};
use crate::{AppState, errors::AppError, response::ApiResponse};
use axum::extract::{Query, State};
use axum::response::Json;
use tracing::{info, instrument};

/// Lists labs with the caller's progress on each. Inactive labs are hidden
/// unless `include_inactive` is set.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<LabView>` (200 OK).
/// * `404 Not Found`: If the user does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn list_labs(
    State(state): State<AppState>,
    Query(params): Query<ListLabsParams>,
) -> Result<ApiResponse<Vec<LabView>>, AppError> {
    info!("Listing labs for user {}", params.user_id);

    let user_id = params.user_id;
    let filter = LabFilter {
        difficulty: params.difficulty,
        category: params.category,
        include_inactive: params.include_inactive,
    };
    let labs = state
        .db
        .read(move |store| progress::list_labs(store, user_id, &filter))
        .await?;

    info!("Found {} labs for user {}", labs.len(), user_id);
    Ok(ApiResponse::ok(labs))
}

/// Returns (wrapped in `ApiResponse`)
/// * `LabView` (200 OK).
/// * `404 Not Found`: If the user or lab does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn get_lab(
    State(state): State<AppState>,
    Query(params): Query<LabParams>,
) -> Result<ApiResponse<LabView>, AppError> {
    info!("Fetching lab {} for user {}", params.lab_id, params.user_id);

    let lab = state
        .db
        .read(move |store| progress::lab_detail(store, params.user_id, params.lab_id))
        .await?;

    Ok(ApiResponse::ok(lab))
}

/// Returns the caller's progress on a lab, `not_started` if there is none.
///
/// Returns (wrapped in `ApiResponse`)
/// * `ProgressView` (200 OK).
/// * `404 Not Found`: If the user or lab does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn get_progress(
    State(state): State<AppState>,
    Query(params): Query<LabParams>,
) -> Result<ApiResponse<ProgressView>, AppError> {
    let view = state
        .db
        .read(move |store| progress::progress_of(store, params.user_id, params.lab_id))
        .await?;

    Ok(ApiResponse::ok(view))
}

/// Starts a lab.
///
/// Request Body: `StartLabPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `ProgressView`: The new in-progress record (201 Created).
/// * `404 Not Found`: If the user or lab does not exist.
/// * `409 Conflict`: If the lab is inactive, already started or already completed.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, payload))]
pub async fn start_lab(
    State(state): State<AppState>,
    Json(payload): Json<StartLabPayload>,
) -> Result<ApiResponse<ProgressView>, AppError> {
    info!("User {} starting lab {}", payload.user_id, payload.lab_id);

    let clock = state.clock.clone();
    let view = state
        .db
        .write(move |store| {
            progress::start(store, clock.as_ref(), payload.user_id, payload.lab_id)
        })
        .await?;

    Ok(ApiResponse::created(view))
}

/// Checks a lab flag and records the attempt.
///
/// A wrong flag is not an error: the response carries `correct: false`.
/// Submissions to a completed lab change nothing and report
/// `already_completed: true`.
///
/// Request Body: `SubmitLabFlagPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `LabSubmission` (200 OK).
/// * `400 Bad Request`: If the flag is empty.
/// * `404 Not Found`: If the user or lab does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, payload))]
pub async fn submit_flag(
    State(state): State<AppState>,
    Json(payload): Json<SubmitLabFlagPayload>,
) -> Result<ApiResponse<LabSubmission>, AppError> {
    info!(
        "User {} submitting flag for lab {}",
        payload.user_id, payload.lab_id
    );

    let clock = state.clock.clone();
    let (user_id, lab_id) = (payload.user_id, payload.lab_id);
    let result = state
        .db
        .write(move |store| {
            progress::submit(store, clock.as_ref(), user_id, lab_id, &payload.flag)
        })
        .await?;

    info!(
        "Lab {} submission by user {}: correct={}, attempts={}",
        lab_id, user_id, result.correct, result.progress.attempts
    );
    Ok(ApiResponse::ok(result))
}
