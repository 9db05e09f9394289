pub mod payments;
pub mod public;
pub mod users;
pub mod webhooks;

use axum::Router;

use crate::db::AppState;

/// Every route the service exposes, without the tracing layer or state attached.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // Public endpoints (no auth)
        .merge(public::router())
        // Gateway webhooks (signature auth when a secret is configured)
        .merge(webhooks::router())
        // Purchase and reporting (API key auth)
        .merge(payments::router(state.clone()))
        .merge(users::router(state))
}
