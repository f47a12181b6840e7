#![allow(dead_code)]

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use uuid::Uuid;
use villa_portal::{
    AppConfig, AppState,
    models::{
        AdminDashboardStats, AvailabilityRequest, Booking, BookingStatus, Profile, UserRole,
        Villa, VillaPackage,
    },
    repository::Repository,
    session::{IdentityError, IdentityService, SessionResolution, SessionUser},
};

// --- MOCK REPOSITORY ---

// Pre-canned answers for every repository call. Counters record how often the
// role lookup is hit, since the gate must do it at most once per request.
#[derive(Default)]
pub struct MockRepo {
    pub role: Option<UserRole>,
    pub profile: Option<Profile>,
    pub villas: Vec<Villa>,
    pub packages: Vec<VillaPackage>,
    pub bookings: Vec<Booking>,
    pub availability: Option<bool>,
    pub stats: AdminDashboardStats,
    pub role_lookups: AtomicUsize,
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_user_role(&self, _id: Uuid) -> Option<UserRole> {
        self.role_lookups.fetch_add(1, Ordering::SeqCst);
        self.role
    }
    async fn get_profile(&self, id: Uuid) -> Option<Profile> {
        self.profile.clone().filter(|profile| profile.id == id)
    }
    async fn list_villas(&self) -> Vec<Villa> {
        self.villas.clone()
    }
    async fn get_villa(&self, id: Uuid) -> Option<Villa> {
        self.villas.iter().find(|villa| villa.id == id).cloned()
    }
    async fn get_villa_packages(&self, villa_id: Uuid) -> Vec<VillaPackage> {
        self.packages
            .iter()
            .filter(|package| package.villa_id == villa_id)
            .cloned()
            .collect()
    }
    async fn get_user_bookings(&self, user_id: Uuid) -> Vec<Booking> {
        self.bookings
            .iter()
            .filter(|booking| booking.user_id == user_id)
            .cloned()
            .collect()
    }
    async fn get_all_bookings(&self) -> Vec<Booking> {
        self.bookings.clone()
    }
    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        cancellation_reason: Option<String>,
    ) -> Option<Booking> {
        self.bookings
            .iter()
            .find(|booking| booking.id == id)
            .cloned()
            .map(|booking| Booking {
                status,
                cancellation_reason: cancellation_reason.or(booking.cancellation_reason.clone()),
                ..booking
            })
    }
    async fn check_booking_availability(
        &self,
        _villa_id: Uuid,
        _request: &AvailabilityRequest,
    ) -> Option<bool> {
        self.availability
    }
    async fn get_stats(&self) -> AdminDashboardStats {
        self.stats.clone()
    }
}

// --- MOCK IDENTITY SERVICE ---

#[derive(Default)]
pub struct MockIdentity {
    pub user: Option<SessionUser>,
    pub cookies: Vec<Cookie<'static>>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockIdentity {
    pub fn signed_in(id: Uuid) -> Self {
        Self {
            user: Some(SessionUser {
                id,
                email: Some("guest@example.com".to_string()),
            }),
            ..Default::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityService for MockIdentity {
    async fn resolve(&self, _jar: &CookieJar) -> Result<SessionResolution, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(IdentityError::MissingUser);
        }
        Ok(SessionResolution {
            user: self.user.clone(),
            cookies: self.cookies.clone(),
        })
    }
}

// --- STATE ---

pub fn test_state(repo: Arc<MockRepo>, identity: Arc<MockIdentity>) -> AppState {
    AppState {
        repo,
        identity,
        config: AppConfig::default(),
    }
}
