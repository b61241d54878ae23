#![allow(dead_code)]

use axum::Router;
pub(crate) use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use cybersib_server::clock::{Clock, ManualClock};
use cybersib_server::model::account::{NewUser, Subscription, UserChanges};
use cybersib_server::model::ctf::{ChallengeDifficulty, NewCtfChallenge};
use cybersib_server::model::lab::{LabDifficulty, NewLab};
use cybersib_server::scoring::ScoringConfig;
use cybersib_server::scoring::flag::hash_flag;
use cybersib_server::store::{Database, MemoryStore};
use cybersib_server::{AppState, init_test_router};
pub(crate) use deadpool_diesel::postgres::{
    Manager as TestManager, Pool as TestPool, Runtime as TestRuntime,
};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

// Postgres-backed tests share one database; they take turns within a test binary.
static PG_LOCK: Mutex<()> = Mutex::const_new(());

pub struct TestEnv {
    pub server: TestServer,
    pub db: Database,
    pub clock: Arc<ManualClock>,
    _pg_guard: Option<MutexGuard<'static, ()>>,
}

pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 14, 10, 0, 0).unwrap()
}

// test infra setup

/// Pool for `TEST_DATABASE_URL`, if set. The database is expected to have
/// the migrations applied already.
pub fn get_test_db_pool() -> Option<TestPool> {
    let db_url = std::env::var("TEST_DATABASE_URL").ok()?;

    let manager = TestManager::new(&db_url, TestRuntime::Tokio1);
    let pool = TestPool::builder(manager)
        .max_size(15)
        .build()
        .expect("Failed to create test database pool");
    Some(pool)
}

pub async fn setup_test_environment() -> TestEnv {
    setup_with_config(ScoringConfig::default()).await
}

/// Memory-backed by default; runs against Postgres when `TEST_DATABASE_URL`
/// is set.
pub async fn setup_with_config(config: ScoringConfig) -> TestEnv {
    let (db, pg_guard) = match get_test_db_pool() {
        Some(pool) => {
            let guard = PG_LOCK.lock().await;
            clear_test_database(&pool).await;
            (Database::Postgres(pool), Some(guard))
        }
        None => (Database::Memory(MemoryStore::new()), None),
    };
    let clock = Arc::new(ManualClock::new(test_epoch()));
    let state = AppState::new(db.clone(), clock.clone(), config);
    let app: Router = init_test_router(state);
    let server = TestServer::new(app).expect("Failed to create TestServer");
    TestEnv {
        server,
        db,
        clock,
        _pg_guard: pg_guard,
    }
}

async fn clear_test_database(pool: &TestPool) {
    println!("Attempting to clear test database...");
    let conn = pool.get().await.expect("Failed to get conn for cleanup");
    conn.interact(|conn| {
        conn.transaction::<_, DieselError, _>(|tx_conn| {
            diesel::sql_query(
                "TRUNCATE feedback, ctf_solves, lab_progress, ctf_challenges, labs, users \
                 RESTART IDENTITY CASCADE",
            )
            .execute(tx_conn)?;
            Ok(())
        })
    })
    .await
    .expect("Interaction failed during cleanup")
    .expect("Transaction failed during cleanup");
    println!("Test database cleared.");
}

// store helpers

pub async fn create_test_user(env: &TestEnv, username: &str) -> i64 {
    let new_user = NewUser::student(
        username,
        &format!("{}@cybersib.test", username),
        "IB-23",
        None,
        env.clock.now(),
    )
    .expect("valid test user");
    env.db
        .write(move |store| Ok(store.insert_user(&new_user)?))
        .await
        .expect("Failed to insert test user")
        .id
}

pub async fn make_premium(env: &TestEnv, user_id: i64) {
    env.db
        .write(move |store| {
            Ok(store.update_user(
                user_id,
                &UserChanges {
                    subscription: Some(Subscription::Premium),
                    ..UserChanges::default()
                },
            )?)
        })
        .await
        .expect("Failed to update test user");
}

pub async fn create_test_lab(
    env: &TestEnv,
    title: &str,
    difficulty: LabDifficulty,
    category: &str,
    points: i32,
    flag: &str,
    active: bool,
) -> i64 {
    let lab = NewLab {
        title: title.to_string(),
        description: format!("{} description", title),
        difficulty,
        category: category.to_string(),
        points,
        time_estimate_minutes: 60,
        flag_hash: hash_flag(flag),
        active,
    };
    env.db
        .write(move |store| Ok(store.insert_lab(&lab)?))
        .await
        .expect("Failed to insert test lab")
        .id
}

pub async fn create_test_challenge(
    env: &TestEnv,
    title: &str,
    category: &str,
    difficulty: ChallengeDifficulty,
    points: i32,
    flag: &str,
) -> i64 {
    let challenge = NewCtfChallenge {
        title: title.to_string(),
        description: format!("{} description", title),
        category: category.to_string(),
        difficulty,
        points,
        flag_hash: hash_flag(flag),
    };
    env.db
        .write(move |store| Ok(store.insert_challenge(&challenge)?))
        .await
        .expect("Failed to insert test challenge")
        .id
}

pub async fn count_solves(env: &TestEnv, challenge_id: i64) -> i64 {
    env.db
        .read(move |store| Ok(store.count_solves(challenge_id)?))
        .await
        .expect("Failed to count solves")
}
