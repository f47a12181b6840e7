use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access control: session resolution, route policy and the middleware gluing them.
pub mod auth;
pub mod gate;
pub mod policy;
pub mod session;

// Data, presentation and HTTP surface.
pub mod config;
pub mod format;
pub mod handlers;
pub mod models;
pub mod repository;

// Route groups matching the access classes (public, dashboard, admin).
pub mod routes;
use routes::{admin, dashboard, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use session::{IdentityState, SupabaseIdentity};

/// ApiDoc
///
/// OpenAPI document for the JSON surface, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_villas, handlers::get_villa_details, handlers::check_availability,
        handlers::signin_page, handlers::signup_page, handlers::get_dashboard,
        handlers::get_my_bookings, handlers::get_admin_stats, handlers::get_admin_bookings,
        handlers::update_booking_status,
    ),
    components(
        schemas(
            models::Profile, models::Villa, models::VillaPackage, models::Booking,
            models::UserRole, models::PackageTier, models::BookingStatus,
            models::AvailabilityRequest, models::AvailabilityResponse,
            models::UpdateBookingStatusRequest, models::VillaSummary, models::VillaDetails,
            models::PackageView, models::BookingView, models::DashboardSummary,
            models::AdminDashboardStats, models::AuthPageInfo,
        )
    ),
    tags(
        (name = "villa-portal", description = "Villa rental booking API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container for the services every request needs.
#[derive(Clone)]
pub struct AppState {
    /// Database reads (profiles, villas, packages, bookings).
    pub repo: RepositoryState,
    /// Supabase session resolution and refresh.
    pub identity: IdentityState,
    /// The loaded environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routes, wraps all of them (and the fallback) in the access
/// gate, then adds the observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(dashboard::dashboard_routes())
        .nest("/admin", admin::admin_routes())
        .fallback(handlers::not_found)
        .with_state(state.clone())
        // The gate sees every request, so it must be added after the fallback.
        .layer(middleware::from_fn_with_state(state, gate::access_gate));

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span for a request, tagging it with the
/// `x-request-id` so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
