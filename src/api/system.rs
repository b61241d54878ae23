use crate::model::system::{HealthReport, HealthStatus, TableCount};
use crate::{AppState, errors::AppError, response::ApiResponse};
use axum::extract::State;
use tracing::{instrument, warn};

/// Counts rows in every table. A store failure is reported as `degraded`
/// rather than as an error status.
///
/// Returns (wrapped in `ApiResponse`)
/// * `HealthReport` (200 OK).
#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> Result<ApiResponse<HealthReport>, AppError> {
    let counts = state
        .db
        .read(|store| Ok(store.table_counts()?))
        .await;

    let (status, tables) = match counts {
        Ok(counts) => (
            HealthStatus::Healthy,
            counts
                .into_iter()
                .map(|(table, rows)| TableCount {
                    table: table.to_string(),
                    rows,
                })
                .collect(),
        ),
        Err(err) => {
            warn!("Health check failed: {}", err);
            (HealthStatus::Degraded, Vec::new())
        }
    };

    Ok(ApiResponse::ok(HealthReport {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        tables,
        checked_at: state.clock.now(),
    }))
}
