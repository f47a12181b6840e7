use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints any visitor may call. The sign-in and sign-up pages live here
/// too; the gate redirects visitors who already have a session to the dashboard.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /villas
        // Active villas as listing cards with their "from" price.
        .route("/villas", get(handlers::list_villas))
        // GET /villas/{id}
        // Detail page: images resolved against the storage bucket, packages cheapest first.
        .route("/villas/{id}", get(handlers::get_villa_details))
        // POST /villas/{id}/availability
        // Wraps the `check_booking_availability` database function.
        .route(
            "/villas/{id}/availability",
            post(handlers::check_availability),
        )
        // --- Auth Pages ---
        // GET /signin?redirectTo=...
        .route("/signin", get(handlers::signin_page))
        // GET /signup
        .route("/signup", get(handlers::signup_page))
}
