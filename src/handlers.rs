use crate::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    format::{self, DEFAULT_CURRENCY, Locale},
    models::{
        AdminDashboardStats, AuthPageInfo, AvailabilityRequest, AvailabilityResponse, Booking,
        BookingView, DashboardSummary, PackageView, UpdateBookingStatusRequest, Villa,
        VillaDetails, VillaPackage, VillaSummary,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// ViewOptions
///
/// Optional presentation settings accepted by the dashboard endpoints.
#[derive(Deserialize, utoipa::IntoParams, Default)]
pub struct ViewOptions {
    /// BCP 47 tag such as `fr-FR` or `en-US`. Unsupported tags fall back to French.
    pub locale: Option<String>,
}

impl ViewOptions {
    fn locale(&self) -> Locale {
        self.locale
            .as_deref()
            .and_then(|tag| tag.parse().ok())
            .unwrap_or_default()
    }
}

/// AuthPageQuery
///
/// Query accepted by the sign-in and sign-up pages. The gate appends
/// `redirectTo` when it bounces a visitor away from a protected page.
#[derive(Deserialize, utoipa::IntoParams, Default)]
pub struct AuthPageQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

// --- View Builders ---

pub fn villa_summary(villa: &Villa, config: &AppConfig) -> VillaSummary {
    let cover = villa.images.first().map(String::as_str).unwrap_or_default();
    VillaSummary {
        id: villa.id,
        name: villa.name.clone(),
        slug: format::slugify(&villa.name),
        location: villa.location.clone(),
        country: villa.country.clone(),
        max_guests: villa.max_guests,
        bedrooms: villa.bedrooms,
        bathrooms: villa.bathrooms,
        cover_image_url: format::image_url(
            cover,
            &config.images_bucket,
            Some(config.supabase_url.as_str()),
        ),
        price_from: villa.price_from,
        price_from_label: villa
            .price_from
            .map(|price| format::format_currency(price, DEFAULT_CURRENCY)),
    }
}

pub fn package_view(package: VillaPackage) -> PackageView {
    PackageView {
        tier_label: package.package_tier.label().to_string(),
        tier_classes: package.package_tier.badge_classes().to_string(),
        price_label: format::format_currency(package.price_per_night, DEFAULT_CURRENCY),
        package,
    }
}

pub fn booking_view(booking: Booking, locale: Locale) -> BookingView {
    BookingView {
        status_label: booking.status.label().to_string(),
        status_classes: booking.status.badge_classes().to_string(),
        dates_label: format::format_date_range(booking.start_date, booking.end_date, locale),
        nights: format::calculate_days_between(booking.start_date, booking.end_date),
        total_label: format::format_currency(booking.total_amount, DEFAULT_CURRENCY),
        booking,
    }
}

// --- Public Handlers ---

/// list_villas
///
/// [Public Route] Active villas as listing cards, newest first.
#[utoipa::path(
    get,
    path = "/villas",
    responses((status = 200, description = "Active villas", body = [VillaSummary]))
)]
pub async fn list_villas(State(state): State<AppState>) -> Json<Vec<VillaSummary>> {
    let villas = state.repo.list_villas().await;
    Json(
        villas
            .iter()
            .map(|villa| villa_summary(villa, &state.config))
            .collect(),
    )
}

/// get_villa_details
///
/// [Public Route] One villa with its resolved image URLs and active packages.
#[utoipa::path(
    get,
    path = "/villas/{id}",
    responses(
        (status = 200, description = "Villa details", body = VillaDetails),
        (status = 404, description = "Not Found or inactive")
    )
)]
pub async fn get_villa_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VillaDetails>, StatusCode> {
    let villa = state.repo.get_villa(id).await.ok_or(StatusCode::NOT_FOUND)?;
    let packages = state.repo.get_villa_packages(id).await;

    let mut summary = villa_summary(&villa, &state.config);
    // Detail queries skip the correlated subquery; derive the floor from the packages.
    if summary.price_from.is_none() {
        summary.price_from = packages
            .iter()
            .map(|package| package.price_per_night)
            .reduce(f64::min);
        summary.price_from_label = summary
            .price_from
            .map(|price| format::format_currency(price, DEFAULT_CURRENCY));
    }

    let image_urls = villa
        .images
        .iter()
        .map(|path| {
            format::image_url(
                path,
                &state.config.images_bucket,
                Some(state.config.supabase_url.as_str()),
            )
        })
        .collect();

    Ok(Json(VillaDetails {
        summary,
        description: villa.description,
        image_urls,
        packages: packages.into_iter().map(package_view).collect(),
    }))
}

/// check_availability
///
/// [Public Route] Runs the `check_booking_availability` database function for a stay.
///
/// Returns 400 when the departure is not after the arrival.
#[utoipa::path(
    post,
    path = "/villas/{id}/availability",
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Availability result", body = AvailabilityResponse),
        (status = 400, description = "end_date must be after start_date"),
        (status = 500, description = "Availability check failed")
    )
)]
pub async fn check_availability(
    State(state): State<AppState>,
    Path(villa_id): Path<Uuid>,
    Json(payload): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, StatusCode> {
    if payload.end_date <= payload.start_date {
        return Err(StatusCode::BAD_REQUEST);
    }

    let available = state
        .repo
        .check_booking_availability(villa_id, &payload)
        .await
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(AvailabilityResponse {
        available,
        nights: format::calculate_days_between(payload.start_date, payload.end_date),
        dates_label: format::format_date_range(
            payload.start_date,
            payload.end_date,
            Locale::default(),
        ),
    }))
}

/// signin_page
///
/// [Auth Page] Signed-in visitors never reach this handler; the gate sends
/// them to the dashboard first.
#[utoipa::path(
    get,
    path = "/signin",
    params(AuthPageQuery),
    responses((status = 200, description = "Sign-in page", body = AuthPageInfo))
)]
pub async fn signin_page(Query(query): Query<AuthPageQuery>) -> Json<AuthPageInfo> {
    auth_page("signin", query)
}

/// signup_page
#[utoipa::path(
    get,
    path = "/signup",
    params(AuthPageQuery),
    responses((status = 200, description = "Sign-up page", body = AuthPageInfo))
)]
pub async fn signup_page(Query(query): Query<AuthPageQuery>) -> Json<AuthPageInfo> {
    auth_page("signup", query)
}

fn auth_page(page: &str, query: AuthPageQuery) -> Json<AuthPageInfo> {
    // Only same-site paths are echoed back; anything else could become an open redirect.
    let redirect_to = query
        .redirect_to
        .filter(|target| target.starts_with('/') && !target.starts_with("//"));
    Json(AuthPageInfo {
        page: page.to_string(),
        redirect_to,
    })
}

// --- Dashboard Handlers ---

/// get_dashboard
///
/// [Dashboard Route] Profile header and bookings of the signed-in customer.
#[utoipa::path(
    get,
    path = "/dashboard",
    params(ViewOptions),
    responses(
        (status = 200, description = "Dashboard", body = DashboardSummary),
        (status = 401, description = "No session")
    )
)]
pub async fn get_dashboard(
    user: AuthUser,
    State(state): State<AppState>,
    Query(options): Query<ViewOptions>,
) -> Json<DashboardSummary> {
    let locale = options.locale();
    let profile = state.repo.get_profile(user.id).await;
    let bookings = state.repo.get_user_bookings(user.id).await;

    Json(DashboardSummary {
        user_id: user.id,
        email: profile
            .as_ref()
            .map(|profile| profile.email.clone())
            .or(user.email),
        full_name: profile.as_ref().and_then(|profile| profile.full_name.clone()),
        role_label: profile.map(|profile| profile.user_role.label().to_string()),
        bookings: bookings
            .into_iter()
            .map(|booking| booking_view(booking, locale))
            .collect(),
    })
}

/// get_my_bookings
#[utoipa::path(
    get,
    path = "/dashboard/bookings",
    params(ViewOptions),
    responses((status = 200, description = "My bookings", body = [BookingView]))
)]
pub async fn get_my_bookings(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(options): Query<ViewOptions>,
) -> Json<Vec<BookingView>> {
    let locale = options.locale();
    let bookings = state.repo.get_user_bookings(id).await;
    Json(
        bookings
            .into_iter()
            .map(|booking| booking_view(booking, locale))
            .collect(),
    )
}

// --- Admin Handlers ---

/// get_admin_stats
///
/// [Admin Route] Counters for the admin dashboard.
///
/// *Authorization*: re-checks the role resolved by the gate.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn get_admin_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    let mut stats = state.repo.get_stats().await;
    stats.revenue_label = format::format_currency(stats.revenue, DEFAULT_CURRENCY);
    Ok(Json(stats))
}

/// get_admin_bookings
///
/// [Admin Route] Every booking, pending first.
#[utoipa::path(
    get,
    path = "/admin/bookings",
    params(ViewOptions),
    responses(
        (status = 200, description = "All bookings", body = [BookingView]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn get_admin_bookings(
    user: AuthUser,
    State(state): State<AppState>,
    Query(options): Query<ViewOptions>,
) -> Result<Json<Vec<BookingView>>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    let locale = options.locale();
    let bookings = state.repo.get_all_bookings().await;
    Ok(Json(
        bookings
            .into_iter()
            .map(|booking| booking_view(booking, locale))
            .collect(),
    ))
}

/// update_booking_status
///
/// [Admin Route] Confirms, cancels or completes a booking.
#[utoipa::path(
    put,
    path = "/admin/bookings/{id}/status",
    request_body = UpdateBookingStatusRequest,
    responses(
        (status = 200, description = "Updated", body = BookingView),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_booking_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBookingStatusRequest>,
) -> Result<Json<BookingView>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    let booking = state
        .repo
        .set_booking_status(id, payload.status, payload.cancellation_reason)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    tracing::info!(booking_id = %id, status = %booking.status, admin = %user.id, "Booking status updated");
    Ok(Json(booking_view(booking, Locale::default())))
}

/// not_found
///
/// Router fallback. Registered explicitly so the access gate also wraps unknown paths.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
