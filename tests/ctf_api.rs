use axum::http::StatusCode;
use axum::response::IntoResponse;
use cybersib_server::model::ctf::{ChallengeDifficulty, ChallengeView, CtfSubmission};
use cybersib_server::model::lab::LabDifficulty;
use cybersib_server::model::stats::LeaderboardEntry;
use cybersib_server::payloads::ctf::SubmitCtfFlagPayload;
use cybersib_server::payloads::labs::SubmitLabFlagPayload;
use cybersib_server::response::ApiResponse;
use cybersib_server::scoring::ScoringConfig;
use cybersib_server::scoring::ledger;
use cybersib_server::scoring::rank::Rank;
use serde_json::Value;
use tokio::task::JoinSet;

mod helpers;
use helpers::{
    TestEnv, count_solves, create_test_challenge, create_test_lab, create_test_user,
    setup_test_environment, setup_with_config, test_epoch,
};

fn submit(user_id: i64, challenge_id: i64, flag: &str) -> SubmitCtfFlagPayload {
    SubmitCtfFlagPayload {
        user_id,
        challenge_id,
        flag: flag.to_string(),
    }
}

async fn solve(env: &TestEnv, user_id: i64, challenge_id: i64, flag: &str) {
    env.server
        .post("/ctf/submit_flag")
        .json(&submit(user_id, challenge_id, flag))
        .await
        .assert_status_ok();
}

// submit_flag

#[tokio::test]
async fn test_submit_flag_records_single_solve() {
    let env = setup_test_environment().await;
    let user_id = create_test_user(&env, "alice").await;
    let challenge_id = create_test_challenge(
        &env,
        "SQL Injection 101",
        "web",
        ChallengeDifficulty::Easy,
        50,
        "CSIB{union}",
    ).await;

    let response = env
        .server
        .post("/ctf/submit_flag")
        .json(&submit(user_id, challenge_id, "CSIB{union}"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<CtfSubmission> = response.json();
    assert_eq!(
        body.data.unwrap(),
        CtfSubmission {
            correct: true,
            points: 50,
            solved_at: Some(test_epoch()),
        }
    );

    let response = env
        .server
        .post("/ctf/submit_flag")
        .json(&submit(user_id, challenge_id, "CSIB{union}"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: ApiResponse<()> = response.json();
    assert_eq!(body.status_code, 409);

    assert_eq!(count_solves(&env, challenge_id).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_correct_submissions_solve_once() {
    let env = setup_test_environment().await;
    let user_id = create_test_user(&env, "alice").await;
    let challenge_id =
        create_test_challenge(&env, "Race", "web", ChallengeDifficulty::Medium, 75, "CSIB{race}").await;

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let db = env.db.clone();
        let clock = env.clock.clone();
        tasks.spawn(async move {
            db.write(move |store| {
                ledger::submit(store, clock.as_ref(), user_id, challenge_id, "CSIB{race}")
            })
            .await
        });
    }
    let results = tasks.join_all().await;

    let mut solved = Vec::new();
    let mut statuses = Vec::new();
    for result in results {
        match result {
            Ok(submission) => solved.push(submission),
            Err(err) => statuses.push(err.into_response().status()),
        }
    }
    assert_eq!(solved.len(), 1);
    assert_eq!(solved[0].points, 75);
    assert_eq!(statuses, vec![StatusCode::CONFLICT; 7]);
    assert_eq!(count_solves(&env, challenge_id).await, 1);
}

#[tokio::test]
async fn test_submit_flag_wrong_is_not_recorded() {
    let env = setup_test_environment().await;
    let user_id = create_test_user(&env, "alice").await;
    let challenge_id = create_test_challenge(
        &env,
        "Caesar",
        "crypto",
        ChallengeDifficulty::Easy,
        30,
        "CSIB{rot3}",
    ).await;

    let response = env
        .server
        .post("/ctf/submit_flag")
        .json(&submit(user_id, challenge_id, "CSIB{rot13}"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let result = response.json::<ApiResponse<CtfSubmission>>().data.unwrap();
    assert!(!result.correct);
    assert_eq!(result.points, 0);
    assert_eq!(result.solved_at, None);
    assert_eq!(count_solves(&env, challenge_id).await, 0);

    let solved: ApiResponse<bool> = env
        .server
        .get("/ctf/is_solved")
        .add_query_param("user_id", user_id)
        .add_query_param("challenge_id", challenge_id)
        .await
        .json();
    assert_eq!(solved.data, Some(false));
}

#[tokio::test]
async fn test_submit_flag_validation_and_missing_challenge() {
    let env = setup_test_environment().await;
    let user_id = create_test_user(&env, "alice").await;
    let challenge_id =
        create_test_challenge(&env, "RSA", "crypto", ChallengeDifficulty::Hard, 150, "CSIB{e3}").await;

    let response = env
        .server
        .post("/ctf/submit_flag")
        .json(&submit(user_id, challenge_id, ""))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = env
        .server
        .post("/ctf/submit_flag")
        .json(&submit(user_id, challenge_id + 100, "CSIB{e3}"))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

// challenge catalogue

#[tokio::test]
async fn test_get_challenge_and_solve_count() {
    let env = setup_test_environment().await;
    let alice = create_test_user(&env, "alice").await;
    let bob = create_test_user(&env, "bob").await;
    let carol = create_test_user(&env, "carol").await;
    let challenge_id =
        create_test_challenge(&env, "Reverse Me", "reverse", ChallengeDifficulty::Hard, 180, "R").await;
    solve(&env, alice, challenge_id, "R").await;
    solve(&env, bob, challenge_id, "R").await;

    let count: ApiResponse<i64> = env
        .server
        .get(&format!("/ctf/get_solve_count/{}", challenge_id))
        .await
        .json();
    assert_eq!(count.data, Some(2));

    let view: ApiResponse<ChallengeView> = env
        .server
        .get("/ctf/get_challenge")
        .add_query_param("user_id", carol)
        .add_query_param("challenge_id", challenge_id)
        .await
        .json();
    let view = view.data.unwrap();
    assert!(!view.solved);
    assert_eq!(view.solve_count, Some(2));

    let response = env.server.get("/ctf/get_solve_count/777").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_challenges_by_category_without_flags() {
    let env = setup_test_environment().await;
    let user_id = create_test_user(&env, "alice").await;
    let web = create_test_challenge(&env, "XSS", "web", ChallengeDifficulty::Medium, 75, "X").await;
    create_test_challenge(&env, "Dump", "forensics", ChallengeDifficulty::Medium, 120, "D").await;
    solve(&env, user_id, web, "X").await;

    let response = env
        .server
        .get("/ctf/list_challenges")
        .add_query_param("user_id", user_id)
        .add_query_param("category", "web")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let raw: Value = response.json();
    let items = raw["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["solved"], Value::Bool(true));
    assert!(items[0].get("flag_hash").is_none());
}

// get_leaderboard

#[tokio::test]
async fn test_leaderboard_combines_labs_and_ctf() {
    let env = setup_test_environment().await;
    let alice = create_test_user(&env, "alice").await;
    let bob = create_test_user(&env, "bob").await;
    let idle = create_test_user(&env, "idle").await;
    let big = create_test_challenge(&env, "Overflow", "pwn", ChallengeDifficulty::Hard, 200, "P").await;
    let small = create_test_challenge(&env, "Caesar", "crypto", ChallengeDifficulty::Easy, 30, "C").await;
    let lab = create_test_lab(&env, "XSS", LabDifficulty::Intermediate, "web", 30, "L", true).await;

    solve(&env, alice, small, "C").await;
    env.server
        .post("/labs/submit_flag")
        .json(&SubmitLabFlagPayload {
            user_id: alice,
            lab_id: lab,
            flag: "L".to_string(),
        })
        .await
        .assert_status_ok();
    solve(&env, bob, big, "P").await;

    let response = env.server.get("/ctf/get_leaderboard").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let board = response
        .json::<ApiResponse<Vec<LeaderboardEntry>>>()
        .data
        .unwrap();
    let order: Vec<(i64, i64, usize)> = board
        .iter()
        .map(|e| (e.user_id, e.total_points, e.position))
        .collect();
    assert_eq!(order, vec![(bob, 200, 1), (alice, 60, 2), (idle, 0, 3)]);
    assert_eq!(board[0].rank_title, Rank::Intermediate);
    assert_eq!(board[1].rank_title, Rank::Novice);
    assert_eq!(board[1].solved_count, 1);
}

#[tokio::test]
async fn test_leaderboard_limit_is_capped() {
    let env = setup_with_config(ScoringConfig {
        leaderboard_default_limit: 2,
        leaderboard_max_limit: 3,
        ..ScoringConfig::default()
    }).await;
    for name in ["u1", "u2", "u3", "u4", "u5"] {
        create_test_user(&env, name).await;
    }

    let default: ApiResponse<Vec<LeaderboardEntry>> =
        env.server.get("/ctf/get_leaderboard").await.json();
    assert_eq!(default.data.unwrap().len(), 2);

    let capped: ApiResponse<Vec<LeaderboardEntry>> = env
        .server
        .get("/ctf/get_leaderboard")
        .add_query_param("limit", 100)
        .await
        .json();
    let capped = capped.data.unwrap();
    assert_eq!(capped.len(), 3);
    assert_eq!(capped[0].username, "u1");

    let empty: ApiResponse<Vec<LeaderboardEntry>> = env
        .server
        .get("/ctf/get_leaderboard")
        .add_query_param("limit", 0)
        .await
        .json();
    assert!(empty.data.unwrap().is_empty());
}
