use crate::model::account::{Feedback, ProfileResponse, User, UserChanges};
use crate::payloads::account::{
    GetProfileParams, RegisterPayload, SubmitFeedbackPayload, UpdateProfilePayload,
};
use crate::scoring::account;
use crate::{AppState, errors::AppError, response::ApiResponse};
use axum::extract::{Query, State};
use axum::response::Json;
use tracing::{debug, info, instrument};

/// Registers a new student account.
///
/// Request Body: `RegisterPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `User`: The created account (201 Created).
/// * `400 Bad Request`: If the username or group is blank or the email is malformed.
/// * `409 Conflict`: If the username or email is already taken.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<ApiResponse<User>, AppError> {
    info!("Registering user '{}'", payload.username);

    let clock = state.clock.clone();
    let user = state
        .db
        .write(move |store| {
            account::register(
                store,
                clock.as_ref(),
                &payload.username,
                &payload.email,
                &payload.group,
                payload.credential_hash,
            )
        })
        .await?;

    info!("Registered user {} as '{}'", user.id, user.username);
    Ok(ApiResponse::created(user))
}

/// Returns the account together with its derived stats.
///
/// Returns (wrapped in `ApiResponse`)
/// * `ProfileResponse` (200 OK).
/// * `404 Not Found`: If the user does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Query(params): Query<GetProfileParams>,
) -> Result<ApiResponse<ProfileResponse>, AppError> {
    info!("Fetching profile of user {}", params.user_id);

    let profile = state
        .db
        .read(move |store| account::profile(store, params.user_id))
        .await?;

    Ok(ApiResponse::ok(profile))
}

/// Applies a partial profile update. Omitted fields stay as they are.
///
/// Request Body: `UpdateProfilePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `User`: The updated account (200 OK).
/// * `400 Bad Request`: If a provided field is blank or malformed.
/// * `404 Not Found`: If the user does not exist.
/// * `409 Conflict`: If the new username or email belongs to another user.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<ApiResponse<User>, AppError> {
    info!("Updating profile of user {}", payload.user_id);
    debug!("Update profile payload: {:?}", payload);

    let user_id = payload.user_id;
    let changes = UserChanges {
        username: payload.username,
        email: payload.email,
        group: payload.group,
        subscription: payload.subscription,
    };
    let user = state
        .db
        .write(move |store| account::update_profile(store, user_id, changes))
        .await?;

    Ok(ApiResponse::ok(user))
}

/// Stores a feedback message. `kind` defaults to "general".
///
/// Request Body: `SubmitFeedbackPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `Feedback`: The stored entry (201 Created).
/// * `400 Bad Request`: If the message is blank.
/// * `404 Not Found`: If the user does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, payload))]
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(payload): Json<SubmitFeedbackPayload>,
) -> Result<ApiResponse<Feedback>, AppError> {
    info!("Receiving feedback from user {}", payload.user_id);

    let clock = state.clock.clone();
    let feedback = state
        .db
        .write(move |store| {
            account::submit_feedback(
                store,
                clock.as_ref(),
                payload.user_id,
                payload.kind.as_deref(),
                &payload.message,
            )
        })
        .await?;

    Ok(ApiResponse::created(feedback))
}
