use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Nested under `/admin`. The gate has already checked the `admin` role before
/// any of these run; handlers still refuse an `AuthUser` without it (403).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Villa, booking and customer counters plus confirmed revenue.
        .route("/stats", get(handlers::get_admin_stats))
        // GET /admin/bookings
        // Every booking, pending first.
        .route("/bookings", get(handlers::get_admin_bookings))
        // PUT /admin/bookings/{id}/status
        // Confirm, cancel or complete a booking.
        .route(
            "/bookings/{id}/status",
            put(handlers::update_booking_status),
        )
}
