use async_trait::async_trait;
use axum::http::StatusCode;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{auth::Claims, config::AppConfig};

/// Prefix Supabase SSR puts in front of base64url-encoded cookie values.
pub const BASE64_PREFIX: &str = "base64-";
/// Longest value written to a single cookie before splitting into `.0`, `.1`, ...
pub const MAX_CHUNK_SIZE: usize = 3180;
/// Supabase SSR default: 400 days.
pub const COOKIE_MAX_AGE_SECS: i64 = 400 * 24 * 60 * 60;

// --- Session Types ---

/// SessionUser
///
/// Identity carried by a valid Supabase session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// SessionResolution
///
/// The resolved user (if any) plus the cookie directives that must reach the
/// browser: refreshed session chunks or removals. Directives are data; the
/// access gate applies them once at the response boundary.
#[derive(Debug, Clone, Default)]
pub struct SessionResolution {
    pub user: Option<SessionUser>,
    pub cookies: Vec<Cookie<'static>>,
}

impl SessionResolution {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: SessionUser) -> Self {
        Self {
            user: Some(user),
            cookies: Vec::new(),
        }
    }
}

/// StoredSession
///
/// JSON document Supabase keeps in the auth cookie and returns from the token
/// endpoint. `user` is kept verbatim so re-encoding does not lose fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
}

/// Subset of the Supabase user object needed to identify the caller.
#[derive(Debug, Deserialize)]
struct AuthApiUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<AuthApiUser> for SessionUser {
    fn from(user: AuthApiUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// IdentityError
///
/// Failures while talking to the identity service or reading its cookies.
/// The access gate treats every variant as an anonymous visitor.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity service answered {0}")]
    UnexpectedStatus(StatusCode),
    #[error("malformed session cookie: {0}")]
    MalformedCookie(String),
    #[error("malformed session payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("refreshed session carries no user")]
    MissingUser,
}

// --- Identity Service Contract ---

/// IdentityService
///
/// Resolves (and, when needed, refreshes) a session from request cookies.
/// Swappable so router tests can run without a Supabase project.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn resolve(&self, jar: &CookieJar) -> Result<SessionResolution, IdentityError>;
}

/// IdentityState
///
/// Shared handle stored in the application state.
pub type IdentityState = Arc<dyn IdentityService>;

// --- Supabase Implementation ---

/// SupabaseIdentity
///
/// Reads the `sb-<ref>-auth-token` cookie and asks the Supabase auth API who
/// owns the access token (`GET /auth/v1/user`) on every request that carries
/// one. Revoked, signed-out or deleted users lose access immediately, and
/// tokens signed with asymmetric project keys work the same as HS256 ones.
/// Expired tokens go straight to a refresh.
#[derive(Clone)]
pub struct SupabaseIdentity {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    cookie_name: String,
}

impl SupabaseIdentity {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            cookie_name: config.auth_cookie_name(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// fetch_user
    ///
    /// Looks the access token up on the auth server. `None` when the server
    /// refuses it with a 4xx: forged, revoked or belonging to a deleted user.
    async fn fetch_user(&self, access_token: &str) -> Result<Option<SessionUser>, IdentityError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(%status, "Access token refused by the auth server");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(IdentityError::UnexpectedStatus(status));
        }

        let user: AuthApiUser = response.json().await?;
        Ok(Some(user.into()))
    }

    /// Signs the visitor out: no user, every auth cookie expired.
    fn signed_out(&self, jar: &CookieJar) -> SessionResolution {
        SessionResolution {
            user: None,
            cookies: removal_cookies(jar, &self.cookie_name),
        }
    }

    /// refresh
    ///
    /// Exchanges the refresh token for a new session. A 4xx answer means the
    /// refresh token is no longer valid: the visitor is signed out and every
    /// auth cookie is cleared. Any other failure is surfaced as an error.
    async fn refresh(
        &self,
        jar: &CookieJar,
        session: &StoredSession,
    ) -> Result<SessionResolution, IdentityError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": session.refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            tracing::info!(%status, "Refresh token rejected; clearing session cookies");
            return Ok(self.signed_out(jar));
        }
        if !status.is_success() {
            return Err(IdentityError::UnexpectedStatus(status));
        }

        let refreshed: StoredSession = response.json().await?;
        let user_value = refreshed.user.clone().ok_or(IdentityError::MissingUser)?;
        let user: AuthApiUser = serde_json::from_value(user_value)?;

        tracing::debug!(user_id = %user.id, "Session refreshed");

        Ok(SessionResolution {
            user: Some(user.into()),
            cookies: session_cookies(jar, &self.cookie_name, &refreshed)?,
        })
    }
}

#[async_trait]
impl IdentityService for SupabaseIdentity {
    async fn resolve(&self, jar: &CookieJar) -> Result<SessionResolution, IdentityError> {
        let Some(raw) = read_auth_cookie(jar, &self.cookie_name) else {
            return Ok(SessionResolution::anonymous());
        };
        let session = match decode_session(&raw) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(error = %e, "Undecodable session cookie; clearing it");
                return Ok(self.signed_out(jar));
            }
        };

        if !access_token_expired(&session.access_token) {
            if let Some(user) = self.fetch_user(&session.access_token).await? {
                return Ok(SessionResolution::authenticated(user));
            }
        }

        // Expired or refused: the refresh token decides.
        self.refresh(jar, &session).await
    }
}

// --- Token & Cookie Codec ---

/// access_token_expired
///
/// Reads the `exp` claim without checking the signature. Tokens that cannot be
/// read count as unexpired and are left for the auth server to judge.
pub fn access_token_expired(token: &str) -> bool {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    match decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(_) => false,
        Err(e) => matches!(e.kind(), ErrorKind::ExpiredSignature),
    }
}

/// read_auth_cookie
///
/// Returns the session cookie value, joining `<name>.0`, `<name>.1`, ... when
/// the session was too large for a single cookie.
pub fn read_auth_cookie(jar: &CookieJar, name: &str) -> Option<String> {
    if let Some(cookie) = jar.get(name) {
        return Some(cookie.value().to_string());
    }

    let mut value = String::new();
    for index in 0.. {
        match jar.get(&format!("{name}.{index}")) {
            Some(chunk) => value.push_str(chunk.value()),
            None => break,
        }
    }
    (!value.is_empty()).then_some(value)
}

/// decode_session
///
/// Accepts both cookie encodings Supabase SSR writes: `base64-<base64url json>`
/// and raw JSON.
pub fn decode_session(raw: &str) -> Result<StoredSession, IdentityError> {
    let json = match raw.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let bytes = URL_SAFE_NO_PAD
                .decode(encoded.trim_end_matches('='))
                .map_err(|e| IdentityError::MalformedCookie(e.to_string()))?;
            String::from_utf8(bytes).map_err(|e| IdentityError::MalformedCookie(e.to_string()))?
        }
        None => raw.to_string(),
    };
    Ok(serde_json::from_str(&json)?)
}

pub fn encode_session(session: &StoredSession) -> Result<String, IdentityError> {
    let json = serde_json::to_vec(session)?;
    Ok(format!("{BASE64_PREFIX}{}", URL_SAFE_NO_PAD.encode(json)))
}

/// session_cookies
///
/// Cookie directives storing `session` under `name`: a single cookie when the
/// encoded value fits, numbered chunks otherwise. Cookies from the previous
/// layout that the new one does not overwrite are cleared.
pub fn session_cookies(
    jar: &CookieJar,
    name: &str,
    session: &StoredSession,
) -> Result<Vec<Cookie<'static>>, IdentityError> {
    let encoded = encode_session(session)?;

    let mut cookies: Vec<Cookie<'static>> = if encoded.len() <= MAX_CHUNK_SIZE {
        vec![session_cookie(name.to_string(), encoded)]
    } else {
        // The encoded value is ASCII, so byte chunks are valid UTF-8.
        encoded
            .as_bytes()
            .chunks(MAX_CHUNK_SIZE)
            .enumerate()
            .map(|(index, chunk)| {
                session_cookie(
                    format!("{name}.{index}"),
                    String::from_utf8_lossy(chunk).into_owned(),
                )
            })
            .collect()
    };

    let stale: Vec<Cookie<'static>> = removal_cookies(jar, name)
        .into_iter()
        .filter(|removal| !cookies.iter().any(|c| c.name() == removal.name()))
        .collect();
    cookies.extend(stale);
    Ok(cookies)
}

/// removal_cookies
///
/// Expiring directives for every auth cookie (whole or chunked) present in the jar.
pub fn removal_cookies(jar: &CookieJar, name: &str) -> Vec<Cookie<'static>> {
    let chunk_prefix = format!("{name}.");
    jar.iter()
        .filter(|cookie| {
            cookie.name() == name
                || cookie
                    .name()
                    .strip_prefix(&chunk_prefix)
                    .is_some_and(|index| index.parse::<usize>().is_ok())
        })
        .map(|cookie| removal_cookie(cookie.name().to_string()))
        .collect()
}

fn session_cookie(name: String, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(false)
        .max_age(time::Duration::seconds(COOKIE_MAX_AGE_SECS))
        .build()
}

fn removal_cookie(name: String) -> Cookie<'static> {
    Cookie::build((name, String::new()))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}
