mod purchase;
mod reports;

pub use purchase::*;
pub use reports::*;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::db::AppState;
use crate::middleware::{caller_auth, require_privileged};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // Any identified caller
        .route("/payments/purchase", post(initiate_purchase))
        .layer(middleware::from_fn_with_state(state.clone(), caller_auth))
        .merge(
            Router::new()
                // Reporting (admin / super admin)
                .route("/payments/courses/{course_id}/buyers", get(get_course_buyers))
                .route("/payments/stats", get(get_payment_stats))
                .layer(middleware::from_fn_with_state(state, require_privileged)),
        )
}
