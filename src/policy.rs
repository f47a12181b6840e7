use axum::http::Uri;
use std::future::Future;
use url::form_urlencoded;
use uuid::Uuid;

use crate::models::UserRole;

// --- Route Classification ---

/// RouteClass
///
/// Coarse category of a request path. Classes are mutually exclusive and are
/// assigned by literal prefix, so `/authors` counts as an auth page just like
/// `/auth/callback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// `/auth*`, `/signin*`, `/signup*`: pages only useful to anonymous visitors.
    AuthPage,
    /// `/dashboard*`: requires a session.
    DashboardPage,
    /// `/admin*`: requires a session whose profile has the admin role.
    AdminPage,
    Other,
}

const AUTH_PREFIXES: [&str; 3] = ["/auth", "/signin", "/signup"];
const DASHBOARD_PREFIX: &str = "/dashboard";
const ADMIN_PREFIX: &str = "/admin";

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const SIGNIN_PATH: &str = "/signin";
pub const REDIRECT_TO_PARAM: &str = "redirectTo";

impl RouteClass {
    pub fn classify(path: &str) -> Self {
        if AUTH_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
            RouteClass::AuthPage
        } else if path.starts_with(ADMIN_PREFIX) {
            RouteClass::AdminPage
        } else if path.starts_with(DASHBOARD_PREFIX) {
            RouteClass::DashboardPage
        } else {
            RouteClass::Other
        }
    }

    /// Dashboard and admin pages both require a session.
    pub fn is_protected(&self) -> bool {
        matches!(self, RouteClass::DashboardPage | RouteClass::AdminPage)
    }
}

const STATIC_PREFIXES: [&str; 3] = ["_next/static", "_next/image", "favicon.ico"];
const STATIC_EXTENSIONS: [&str; 6] = [".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp"];

/// is_static_asset
///
/// Paths the gate never looks at: build output, image optimisation, the
/// favicon and anything ending in a common image extension. Matching is
/// case-sensitive and applies to the path after its leading `/`.
pub fn is_static_asset(path: &str) -> bool {
    let rest = path.strip_prefix('/').unwrap_or(path);
    STATIC_PREFIXES.iter().any(|prefix| rest.starts_with(prefix))
        || STATIC_EXTENSIONS.iter().any(|ext| rest.ends_with(ext))
}

// --- Decisions ---

/// RedirectTarget
///
/// A redirect built from the original request URL: the path is replaced and
/// the original query string is carried over byte for byte. The sign-in
/// redirect is the exception: its query is re-encoded with `redirectTo` set
/// in place of the first existing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub path: &'static str,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
}

impl RedirectTarget {
    fn from_uri(path: &'static str, uri: &Uri) -> Self {
        let query = uri
            .query()
            .filter(|query| !query.is_empty())
            .map(str::to_owned);
        Self { path, query }
    }

    /// Sets `key` at the position of its first occurrence, dropping any
    /// repeats, or appends it when absent.
    fn with_param(mut self, key: &str, value: &str) -> Self {
        let existing: Vec<(String, String)> = self
            .query
            .as_deref()
            .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
            .unwrap_or_else(Vec::new);

        let mut pairs = Vec::with_capacity(existing.len() + 1);
        let mut set = false;
        for (k, v) in existing {
            if k != key {
                pairs.push((k, v));
            } else if !set {
                pairs.push((k, value.to_string()));
                set = true;
            }
        }
        if !set {
            pairs.push((key.to_string(), value.to_string()));
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        self.query = Some(query);
        self
    }

    /// Decoded value of a query parameter on the target, if set.
    pub fn param(&self, key: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Relative `Location` header value.
    pub fn location(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.to_string(),
        }
    }
}

/// AccessDecision
///
/// Outcome of the access policy for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Continue,
    Redirect(RedirectTarget),
}

impl AccessDecision {
    pub fn is_continue(&self) -> bool {
        matches!(self, AccessDecision::Continue)
    }
}

/// evaluate
///
/// Applies the redirect policy to one request. Rules, first match wins:
///
/// 1. Auth page with a session: send the visitor to `/dashboard`.
/// 2. Dashboard or admin page without a session: send them to `/signin`,
///    remembering the original path in `redirectTo`.
/// 3. Admin page with a session: look the role up once; anything but
///    `Admin` (including a failed or empty lookup) goes to `/dashboard`.
/// 4. Otherwise continue.
///
/// `role_lookup` is only awaited for rule 3, so at most one lookup happens per
/// request. The function has no other side effects: the same
/// `(uri, session, role)` always produces the same decision.
pub async fn evaluate<F, Fut>(uri: &Uri, session: Option<Uuid>, role_lookup: F) -> AccessDecision
where
    F: FnOnce(Uuid) -> Fut,
    Fut: Future<Output = Option<UserRole>>,
{
    let path = uri.path();
    let class = RouteClass::classify(path);

    match (class, session) {
        (RouteClass::AuthPage, Some(_)) => {
            AccessDecision::Redirect(RedirectTarget::from_uri(DASHBOARD_PATH, uri))
        }
        (class, None) if class.is_protected() => AccessDecision::Redirect(
            RedirectTarget::from_uri(SIGNIN_PATH, uri).with_param(REDIRECT_TO_PARAM, path),
        ),
        (RouteClass::AdminPage, Some(user_id)) => match role_lookup(user_id).await {
            Some(UserRole::Admin) => AccessDecision::Continue,
            Some(UserRole::Customer) | None => {
                AccessDecision::Redirect(RedirectTarget::from_uri(DASHBOARD_PATH, uri))
            }
        },
        _ => AccessDecision::Continue,
    }
}
