use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Dashboard Router Module
///
/// Customer pages. Every handler takes the `AuthUser` the gate placed in the
/// request extensions, so a request without a session never reaches them.
pub fn dashboard_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /dashboard
        // Profile header plus the customer's bookings.
        .route("/dashboard", get(handlers::get_dashboard))
        // GET /dashboard/bookings
        .route("/dashboard/bookings", get(handlers::get_my_bookings))
}
