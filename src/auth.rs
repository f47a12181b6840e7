use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{models::UserRole, session::SessionUser};

/// Claims
///
/// Payload of a Supabase access token. The auth server validates the token;
/// locally only `exp` is read, to refresh without a wasted round trip.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the `auth.users` id, which is also the `profiles` primary key.
    pub sub: Uuid,
    /// Expiration Time (exp). Expired tokens trigger a refresh, not a rejection.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
    /// Audience (aud): `authenticated` for signed-in users.
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// AuthUser
///
/// The resolved identity of a request that passed the access gate with a
/// session. The gate stores it in the request extensions; handlers take it as
/// an extractor argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    /// Only resolved on admin pages, where the gate looks the role up.
    pub role: Option<UserRole>,
}

impl AuthUser {
    pub fn from_session(user: SessionUser, role: Option<UserRole>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(UserRole::Admin)
    }
}

/// AuthUser Extractor Implementation
///
/// Reads the identity placed in the request extensions by the access gate.
///
/// Rejection: StatusCode::UNAUTHORIZED (401) when the request carries no
/// session, e.g. a route outside the dashboard/admin prefixes.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
