use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Database Enums (public schema) ---

/// UserRole
///
/// Mirrors `user_role_enum`. Admin pages are only reachable with `Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "user_role_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

/// PackageTier
///
/// Mirrors `package_tier_enum`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "package_tier_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PackageTier {
    #[default]
    Basic,
    Premium,
    Luxury,
}

/// BookingStatus
///
/// Mirrors `booking_status_enum`. New bookings start as `Pending`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "booking_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// Returned when a database enum is parsed from an unknown string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Admin => "admin",
        }
    }
}

impl PackageTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageTier::Basic => "basic",
            PackageTier::Premium => "premium",
            PackageTier::Luxury => "luxury",
        }
    }
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

impl FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(UserRole::Customer),
            "admin" => Ok(UserRole::Admin),
            other => Err(UnknownVariant { kind: "user_role", value: other.to_string() }),
        }
    }
}

impl FromStr for PackageTier {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(PackageTier::Basic),
            "premium" => Ok(PackageTier::Premium),
            "luxury" => Ok(PackageTier::Luxury),
            other => Err(UnknownVariant { kind: "package_tier", value: other.to_string() }),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(UnknownVariant { kind: "booking_status", value: other.to_string() }),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PackageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Core Rows (Mapped to Database) ---

/// Profile
///
/// A row of `public.profiles`. The primary key is also the foreign key to the
/// Supabase `auth.users` table, so the session's `sub` claim addresses it directly.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub user_role: UserRole,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Villa
///
/// A row of `public.villas`. `images` holds storage paths or absolute URLs.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Villa {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    pub country: String,
    pub max_guests: i32,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub images: Vec<String>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    // Cheapest active package; only loaded by the listing query.
    #[sqlx(default)]
    pub price_from: Option<f64>,
}

/// VillaPackage
///
/// A row of `public.villa_packages`, the priced offer a booking is made against.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct VillaPackage {
    pub id: Uuid,
    pub villa_id: Uuid,
    pub package_name: String,
    pub package_tier: PackageTier,
    pub price_per_night: f64,
    pub description: String,
    pub amenities: Vec<String>,
    pub included_services: Vec<String>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Booking
///
/// A row of `public.bookings`. `end_date` is the departure day, so the stay
/// covers `start_date..end_date`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub villa_id: Uuid,
    pub package_id: Uuid,
    #[ts(type = "string")]
    pub start_date: NaiveDate,
    #[ts(type = "string")]
    pub end_date: NaiveDate,
    pub guests: i32,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub stripe_payment_intent_id: Option<String>,
    pub special_requests: Option<String>,
    pub cancellation_reason: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// AvailabilityRequest
///
/// Arguments of the `check_booking_availability` database function
/// (POST /villas/{id}/availability). The villa id comes from the path.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AvailabilityRequest {
    pub package_id: Uuid,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "2025-07-01")]
    pub start_date: NaiveDate,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "2025-07-08")]
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_booking_id: Option<Uuid>,
}

/// UpdateBookingStatusRequest
///
/// Admin payload for PUT /admin/bookings/{id}/status.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

// --- Presentation Schemas (Output) ---

/// VillaSummary
///
/// Card-sized view of a villa for the public listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct VillaSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub location: String,
    pub country: String,
    pub max_guests: i32,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub cover_image_url: String,
    pub price_from: Option<f64>,
    pub price_from_label: Option<String>,
}

/// PackageView
///
/// A package with its tier label, badge classes and formatted nightly price.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PackageView {
    #[serde(flatten)]
    pub package: VillaPackage,
    pub tier_label: String,
    pub tier_classes: String,
    pub price_label: String,
}

/// VillaDetails
///
/// Detail page payload (GET /villas/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct VillaDetails {
    pub summary: VillaSummary,
    pub description: String,
    pub image_urls: Vec<String>,
    pub packages: Vec<PackageView>,
}

/// BookingView
///
/// A booking decorated with everything the dashboard tables render.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub status_label: String,
    pub status_classes: String,
    pub dates_label: String,
    pub nights: i64,
    pub total_label: String,
}

/// AvailabilityResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AvailabilityResponse {
    pub available: bool,
    pub nights: i64,
    pub dates_label: String,
}

/// DashboardSummary
///
/// Output schema for GET /dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardSummary {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role_label: Option<String>,
    pub bookings: Vec<BookingView>,
}

/// AdminDashboardStats
///
/// Output schema for the administrative statistics dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_villas: i64,
    pub total_bookings: i64,
    /// Bookings still waiting for confirmation.
    pub pending_bookings: i64,
    pub total_customers: i64,
    /// Sum of `total_amount` over confirmed and completed bookings.
    pub revenue: f64,
    #[serde(default)]
    pub revenue_label: String,
}

/// AuthPageInfo
///
/// Payload of the sign-in and sign-up pages. `redirect_to` echoes the
/// `redirectTo` query parameter set by the access gate.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthPageInfo {
    pub page: String,
    pub redirect_to: Option<String>,
}
