use crate::cli::{Args, StorageBackend};
use crate::clock::{Clock, SystemClock};
use crate::scoring::ScoringConfig;
use crate::store::{Database, MemoryStore};
use anyhow::{Context, anyhow};
use axum::Router;
use axum::routing::{get, post};
use axum_keycloak_auth::PassthroughMode;
use axum_keycloak_auth::instance::{KeycloakAuthInstance, KeycloakConfig};
use axum_keycloak_auth::layer::KeycloakAuthLayer;
use deadpool_diesel::Runtime;
use deadpool_diesel::postgres::{Manager, Pool};
use std::sync::Arc;
use tracing::{info, warn};

pub mod cli;
pub mod clock;
pub mod model;
pub mod payloads;
pub mod response;
pub mod schema;
pub mod scoring;
pub mod seed;
pub mod store;

mod api;
mod errors;

pub use errors::AppError;

/// Everything a handler needs: the store, the time source and scoring knobs.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub clock: Arc<dyn Clock>,
    pub config: ScoringConfig,
}

impl AppState {
    pub fn new(db: Database, clock: Arc<dyn Clock>, config: ScoringConfig) -> Self {
        AppState { db, clock, config }
    }
}

pub async fn init_router(args: &Args) -> anyhow::Result<Router> {
    info!("Initializing {:?} storage backend...", args.storage);
    let db = init_database(args).context("Failed to initialize storage")?;

    let config = ScoringConfig {
        leaderboard_max_limit: args.leaderboard_max_limit,
        leaderboard_default_limit: ScoringConfig::default()
            .leaderboard_default_limit
            .min(args.leaderboard_max_limit),
        ..ScoringConfig::default()
    };
    let state = AppState::new(db, Arc::new(SystemClock), config);

    if args.seed_demo_data {
        seed_state(&state).await?;
    }

    info!("Initializing Keycloak authentication layer...");
    let keycloak_layer =
        init_protection_layer(args).context("Failed to initialize Keycloak layer")?;

    info!("Initializing router...");
    Ok(init_router_internal(state, keycloak_layer))
}

/// Seeds the demo catalogue through the state's store and clock.
pub async fn seed_state(state: &AppState) -> anyhow::Result<()> {
    let clock = state.clock.clone();
    let seeded = state
        .db
        .write(move |store| seed::seed_demo_data(store, clock.as_ref()))
        .await
        .map_err(|err| anyhow!("Failed to seed demo data: {}", err))?;
    if !seeded {
        warn!("Demo seed requested but the catalogue is not empty");
    }
    Ok(())
}

pub fn init_test_router(state: AppState) -> Router {
    Router::new()
        .nest("/account", account_routes())
        .nest("/labs", lab_routes())
        .nest("/ctf", ctf_routes().merge(ctf_public_routes()))
        .nest("/stats", stats_routes())
        .nest("/system", system_routes())
        .with_state(state)
}

fn init_router_internal(state: AppState, keycloak_layer: KeycloakAuthLayer<String>) -> Router {
    let account_api = account_routes().layer(keycloak_layer.clone());
    let lab_api = lab_routes().layer(keycloak_layer.clone());
    let ctf_api = ctf_routes()
        .layer(keycloak_layer.clone())
        .merge(ctf_public_routes());
    let stats_api = stats_routes().layer(keycloak_layer.clone());

    Router::new()
        .nest("/account", account_api)
        .nest("/labs", lab_api)
        .nest("/ctf", ctf_api)
        .nest("/stats", stats_api)
        .nest("/system", system_routes())
        .with_state(state)
}

fn init_database(args: &Args) -> anyhow::Result<Database> {
    match args.storage {
        StorageBackend::Postgres => {
            let conn_str = args
                .connection_str
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL is required for the postgres backend"))?;
            let pool = init_pool(conn_str, args.db_pool_max_size)
                .context("Failed to initialize database pool")?;
            Ok(Database::Postgres(pool))
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on shutdown");
            Ok(Database::Memory(MemoryStore::new()))
        }
    }
}

fn init_pool(conn_str: &str, max_size: u32) -> anyhow::Result<Pool> {
    let manager = Manager::new(conn_str, Runtime::Tokio1);
    let pool = Pool::builder(manager).max_size(max_size as usize).build()?;
    Ok(pool)
}

fn init_protection_layer(args: &Args) -> anyhow::Result<KeycloakAuthLayer<String>> {
    let config = KeycloakConfig::builder()
        .server(args.keycloak_server_url.clone())
        .realm(args.keycloak_realm.clone())
        .build();

    let instance = KeycloakAuthInstance::new(config);

    let layer = KeycloakAuthLayer::builder()
        .instance(instance)
        .passthrough_mode(PassthroughMode::Block)
        .persist_raw_claims(false)
        .expected_audiences(vec![args.keycloak_audiences.clone()])
        .build();

    Ok(layer)
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(api::account::register))
        .route("/get_profile", get(api::account::get_profile))
        .route("/update_profile", post(api::account::update_profile))
        .route("/submit_feedback", post(api::account::submit_feedback))
}

fn lab_routes() -> Router<AppState> {
    Router::new()
        .route("/list_labs", get(api::labs::list_labs))
        .route("/get_lab", get(api::labs::get_lab))
        .route("/get_progress", get(api::labs::get_progress))
        .route("/start_lab", post(api::labs::start_lab))
        .route("/submit_flag", post(api::labs::submit_flag))
}

fn ctf_routes() -> Router<AppState> {
    Router::new()
        .route("/list_challenges", get(api::ctf::list_challenges))
        .route("/get_challenge", get(api::ctf::get_challenge))
        .route("/is_solved", get(api::ctf::is_solved))
        .route(
            "/get_solve_count/{challenge_id}",
            get(api::ctf::get_solve_count),
        )
        .route("/submit_flag", post(api::ctf::submit_flag))
}

fn ctf_public_routes() -> Router<AppState> {
    Router::new().route("/get_leaderboard", get(api::ctf::get_leaderboard))
}

fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/get_user_stats", get(api::stats::get_user_stats))
        .route("/get_ctf_stats", get(api::stats::get_ctf_stats))
        .route(
            "/get_category_breakdown",
            get(api::stats::get_category_breakdown),
        )
        .route(
            "/get_difficulty_breakdown",
            get(api::stats::get_difficulty_breakdown),
        )
        .route(
            "/get_weekly_activity",
            get(api::stats::get_weekly_activity),
        )
        .route(
            "/get_recent_activity",
            get(api::stats::get_recent_activity),
        )
        .route(
            "/get_lab_difficulty_progress",
            get(api::stats::get_lab_difficulty_progress),
        )
        .route(
            "/get_progress_report",
            get(api::stats::get_progress_report),
        )
        .route(
            "/get_platform_overview",
            get(api::stats::get_platform_overview),
        )
}

fn system_routes() -> Router<AppState> {
    Router::new().route("/health", get(api::system::health))
}
