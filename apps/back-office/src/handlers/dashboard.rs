//! Dashboard handler.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use bistro_core::DashboardStats;
use chrono::Utc;

use crate::auth::AuthAccount;
use crate::error::ApiResult;
use crate::extract::Json;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard_stats", get(dashboard_stats))
}

/// `GET /dashboard/dashboard_stats` for the current UTC day.
pub async fn dashboard_stats(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ApiResult<Json<DashboardStats>> {
    let stats = state.db.reports().dashboard(auth.scope(), Utc::now()).await?;
    Ok(Json(stats))
}
