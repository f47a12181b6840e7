use crate::models::{
    AdminDashboardStats, AvailabilityRequest, Booking, BookingStatus, Profile, UserRole, Villa,
    VillaPackage,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Read access to the hosted booking database. Handlers and the access gate
/// only see this trait, so tests can substitute an in-memory implementation.
///
/// Implementations log database errors and degrade to `None`/empty results;
/// callers treat a missing row and a failed query the same way.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Access Control ---
    // `SELECT user_role FROM profiles WHERE id = ?`, at most one row.
    async fn get_user_role(&self, id: Uuid) -> Option<UserRole>;
    async fn get_profile(&self, id: Uuid) -> Option<Profile>;

    // --- Catalogue ---
    // Active villas, with the cheapest active package price attached.
    async fn list_villas(&self) -> Vec<Villa>;
    async fn get_villa(&self, id: Uuid) -> Option<Villa>;
    // Active packages of a villa, cheapest first.
    async fn get_villa_packages(&self, villa_id: Uuid) -> Vec<VillaPackage>;

    // --- Bookings ---
    async fn get_user_bookings(&self, user_id: Uuid) -> Vec<Booking>;
    async fn get_all_bookings(&self) -> Vec<Booking>;
    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        cancellation_reason: Option<String>,
    ) -> Option<Booking>;
    /// Delegates to the `check_booking_availability` database function.
    /// `None` means the check itself failed.
    async fn check_booking_availability(
        &self,
        villa_id: Uuid,
        request: &AvailabilityRequest,
    ) -> Option<bool>;

    // --- Admin ---
    async fn get_stats(&self) -> AdminDashboardStats;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const VILLA_COLUMNS: &str = "v.id, v.name, v.description, v.location, v.country, v.max_guests, \
     v.bedrooms, v.bathrooms, v.images, v.is_active, v.created_at, v.updated_at";

const PACKAGE_COLUMNS: &str = "id, villa_id, package_name, package_tier, \
     price_per_night::float8 AS price_per_night, description, amenities, included_services, \
     is_active, created_at, updated_at";

const BOOKING_COLUMNS: &str = "id, user_id, villa_id, package_id, start_date, end_date, guests, \
     total_amount::float8 AS total_amount, status, stripe_payment_intent_id, special_requests, \
     cancellation_reason, created_at, updated_at";

/// PostgresRepository
///
/// `Repository` backed by the Supabase Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// get_user_role
    ///
    /// The single lookup behind the admin-page check. Errors are logged and
    /// reported as "no role", which the policy treats as non-admin.
    async fn get_user_role(&self, id: Uuid) -> Option<UserRole> {
        sqlx::query_scalar::<_, UserRole>("SELECT user_role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user_role error: {:?}", e);
                None
            })
    }

    async fn get_profile(&self, id: Uuid) -> Option<Profile> {
        sqlx::query_as::<_, Profile>(
            r#"SELECT id, email, full_name, phone, user_role, created_at, updated_at, is_active
               FROM profiles
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_profile error: {:?}", e);
            None
        })
    }

    /// list_villas
    ///
    /// Active villas, newest first. `price_from` is the cheapest active package,
    /// computed in a correlated subquery so the listing stays a single round trip.
    async fn list_villas(&self) -> Vec<Villa> {
        let query = format!(
            r#"SELECT {VILLA_COLUMNS},
                  (SELECT MIN(p.price_per_night)::float8
                     FROM villa_packages p
                    WHERE p.villa_id = v.id AND p.is_active = true) AS price_from
               FROM villas v
               WHERE v.is_active = true
               ORDER BY v.created_at DESC"#
        );
        match sqlx::query_as::<_, Villa>(&query).fetch_all(&self.pool).await {
            Ok(villas) => villas,
            Err(e) => {
                tracing::error!("list_villas error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_villa(&self, id: Uuid) -> Option<Villa> {
        let query = format!(
            "SELECT {VILLA_COLUMNS} FROM villas v WHERE v.id = $1 AND v.is_active = true"
        );
        sqlx::query_as::<_, Villa>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_villa error: {:?}", e);
                None
            })
    }

    async fn get_villa_packages(&self, villa_id: Uuid) -> Vec<VillaPackage> {
        let query = format!(
            "SELECT {PACKAGE_COLUMNS} FROM villa_packages \
             WHERE villa_id = $1 AND is_active = true \
             ORDER BY price_per_night ASC"
        );
        match sqlx::query_as::<_, VillaPackage>(&query)
            .bind(villa_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(packages) => packages,
            Err(e) => {
                tracing::error!("get_villa_packages error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_user_bookings
    ///
    /// A customer's own bookings, upcoming stays first.
    async fn get_user_bookings(&self, user_id: Uuid) -> Vec<Booking> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY start_date DESC"
        );
        match sqlx::query_as::<_, Booking>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(bookings) => bookings,
            Err(e) => {
                tracing::error!("get_user_bookings error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_all_bookings
    ///
    /// Admin view: every booking, pending ones first so they surface for review.
    async fn get_all_bookings(&self) -> Vec<Booking> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             ORDER BY (status = 'pending') DESC, created_at DESC"
        );
        match sqlx::query_as::<_, Booking>(&query).fetch_all(&self.pool).await {
            Ok(bookings) => bookings,
            Err(e) => {
                tracing::error!("get_all_bookings error: {:?}", e);
                vec![]
            }
        }
    }

    /// set_booking_status
    ///
    /// Admin status change. The cancellation reason is only overwritten when one is supplied.
    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        cancellation_reason: Option<String>,
    ) -> Option<Booking> {
        let query = format!(
            r#"UPDATE bookings
               SET status = $2,
                   cancellation_reason = COALESCE($3, cancellation_reason),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {BOOKING_COLUMNS}"#
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(status)
            .bind(cancellation_reason)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("set_booking_status error: {:?}", e);
                None
            })
    }

    async fn check_booking_availability(
        &self,
        villa_id: Uuid,
        request: &AvailabilityRequest,
    ) -> Option<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT check_booking_availability(
                   p_villa_id => $1,
                   p_package_id => $2,
                   p_start_date => $3,
                   p_end_date => $4,
                   p_exclude_booking_id => $5
               )"#,
        )
        .bind(villa_id)
        .bind(request.package_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.exclude_booking_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("check_booking_availability error: {:?}", e))
        .ok()
    }

    /// get_stats
    ///
    /// Compiles the counters for the administrative dashboard.
    async fn get_stats(&self) -> AdminDashboardStats {
        let total_villas = self.count("SELECT COUNT(*) FROM villas").await;
        let total_bookings = self.count("SELECT COUNT(*) FROM bookings").await;
        let pending_bookings = self
            .count("SELECT COUNT(*) FROM bookings WHERE status = 'pending'")
            .await;
        let total_customers = self
            .count("SELECT COUNT(*) FROM profiles WHERE user_role = 'customer'")
            .await;
        let revenue = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(total_amount), 0)::float8 FROM bookings \
             WHERE status IN ('confirmed', 'completed')",
        )
        .fetch_one(&self.pool)
        .await
        .unwrap_or(0.0);

        AdminDashboardStats {
            total_villas,
            total_bookings,
            pending_bookings,
            total_customers,
            revenue,
            revenue_label: String::new(),
        }
    }
}

impl PostgresRepository {
    async fn count(&self, query: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(query)
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("count error ({}): {:?}", query, e);
                0
            })
    }
}
