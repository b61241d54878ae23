use axum::http::StatusCode;
use cybersib_server::model::account::{Feedback, ProfileResponse, Role, Subscription, User};
use cybersib_server::model::ctf::ChallengeDifficulty;
use cybersib_server::model::system::{HealthReport, HealthStatus};
use cybersib_server::payloads::account::{
    RegisterPayload, SubmitFeedbackPayload, UpdateProfilePayload,
};
use cybersib_server::payloads::ctf::SubmitCtfFlagPayload;
use cybersib_server::response::ApiResponse;
use cybersib_server::scoring::rank::Rank;
use serde_json::{Value, json};

mod helpers;
use helpers::{create_test_challenge, create_test_user, setup_test_environment, test_epoch};

fn register_payload(username: &str, email: &str) -> RegisterPayload {
    RegisterPayload {
        username: username.to_string(),
        email: email.to_string(),
        group: "IB-24".to_string(),
        credential_hash: Some("kc:7f3a".to_string()),
    }
}

// register

#[tokio::test]
async fn test_register_success() {
    let env = setup_test_environment().await;

    let response = env
        .server
        .post("/account/register")
        .json(&register_payload("neo", "neo@cybersib.spt"))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let raw: Value = response.json();
    assert!(raw["data"].get("credential_hash").is_none());

    let body: ApiResponse<User> = response.json();
    assert_eq!(body.status_code, 201);
    let user = body.data.unwrap();
    assert_eq!(user.username, "neo");
    assert_eq!(user.group, "IB-24");
    assert_eq!(user.role, Role::Student);
    assert_eq!(user.subscription, Subscription::Free);
    assert_eq!(user.created_at, test_epoch());
    assert!(user.avatar_url.unwrap().contains("robohash.org/neo"));
}

#[tokio::test]
async fn test_register_conflicts_and_validation() {
    let env = setup_test_environment().await;
    env.server
        .post("/account/register")
        .json(&register_payload("neo", "neo@cybersib.spt"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = env
        .server
        .post("/account/register")
        .json(&register_payload("neo", "other@cybersib.spt"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = env
        .server
        .post("/account/register")
        .json(&register_payload("trinity", "neo@cybersib.spt"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = env
        .server
        .post("/account/register")
        .json(&register_payload("morpheus", "no-at-sign"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

// get_profile / update_profile

#[tokio::test]
async fn test_get_profile_includes_stats() {
    let env = setup_test_environment().await;
    let user_id = create_test_user(&env, "alice").await;
    let first = create_test_challenge(&env, "A", "crypto", ChallengeDifficulty::Easy, 30, "A").await;
    let second = create_test_challenge(&env, "B", "crypto", ChallengeDifficulty::Hard, 150, "B").await;
    for (challenge_id, flag) in [(first, "A"), (second, "B")] {
        env.server
            .post("/ctf/submit_flag")
            .json(&SubmitCtfFlagPayload {
                user_id,
                challenge_id,
                flag: flag.to_string(),
            })
            .await
            .assert_status_ok();
    }

    let response = env
        .server
        .get("/account/get_profile")
        .add_query_param("user_id", user_id)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let profile = response.json::<ApiResponse<ProfileResponse>>().data.unwrap();
    assert_eq!(profile.user.id, user_id);
    assert_eq!(profile.stats.ctf_points, 180);
    assert_eq!(profile.stats.total_points, 180);
    assert_eq!(profile.stats.rank, Rank::Intermediate);
}

#[tokio::test]
async fn test_get_profile_unknown_user() {
    let env = setup_test_environment().await;

    let response = env
        .server
        .get("/account/get_profile")
        .add_query_param("user_id", 12345)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_profile() {
    let env = setup_test_environment().await;
    let alice = create_test_user(&env, "alice").await;
    create_test_user(&env, "bob").await;

    let response = env
        .server
        .post("/account/update_profile")
        .json(&UpdateProfilePayload {
            user_id: alice,
            username: None,
            email: None,
            group: Some("IB-25".to_string()),
            subscription: Some(Subscription::Premium),
        })
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let user = response.json::<ApiResponse<User>>().data.unwrap();
    assert_eq!(user.group, "IB-25");
    assert_eq!(user.subscription, Subscription::Premium);
    assert_eq!(user.username, "alice");

    let response = env
        .server
        .post("/account/update_profile")
        .json(&json!({ "user_id": alice, "email": "bob@cybersib.test" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

// submit_feedback

#[tokio::test]
async fn test_submit_feedback() {
    let env = setup_test_environment().await;
    let user_id = create_test_user(&env, "alice").await;

    let response = env
        .server
        .post("/account/submit_feedback")
        .json(&SubmitFeedbackPayload {
            user_id,
            kind: None,
            message: "The nmap lab VM is slow".to_string(),
        })
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let feedback = response.json::<ApiResponse<Feedback>>().data.unwrap();
    assert_eq!(feedback.kind, "general");
    assert_eq!(feedback.status, "new");
    assert_eq!(feedback.user_id, user_id);

    let response = env
        .server
        .post("/account/submit_feedback")
        .json(&SubmitFeedbackPayload {
            user_id,
            kind: Some("bug".to_string()),
            message: String::new(),
        })
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

// system

#[tokio::test]
async fn test_health_reports_table_counts() {
    let env = setup_test_environment().await;
    create_test_user(&env, "alice").await;

    let response = env.server.get("/system/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let report = response.json::<ApiResponse<HealthReport>>().data.unwrap();
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.version, env!("CARGO_PKG_VERSION"));
    let users = report.tables.iter().find(|t| t.table == "users").unwrap();
    assert_eq!(users.rows, 1);
}
