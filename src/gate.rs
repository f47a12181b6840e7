use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header::COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    config::Env,
    models::UserRole,
    policy::{self, AccessDecision, RouteClass, is_static_asset},
    session::{SessionResolution, SessionUser},
};

/// Header honoured in `Env::Local` to act as an existing profile without a Supabase session.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// access_gate
///
/// Middleware wrapped around the whole router (fallback included).
///
/// 1. Static assets pass straight through: no session work, no cookies.
/// 2. The session is resolved from cookies. Identity failures are logged and
///    the request continues as anonymous.
/// 3. The access policy decides between continuing and redirecting.
/// 4. Cookie directives from a refresh are collected into the jar and written
///    once, onto whichever response leaves the gate.
pub async fn access_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if is_static_asset(&path) {
        return next.run(request).await;
    }

    let resolution = resolve_session(&state, &jar, request.headers()).await;
    let session_id = resolution.user.as_ref().map(|user| user.id);

    let repo = state.repo.clone();
    let decision = policy::evaluate(request.uri(), session_id, |user_id| async move {
        repo.get_user_role(user_id).await
    })
    .await;

    let class = RouteClass::classify(&path);
    tracing::debug!(
        path = %path,
        class = ?class,
        authenticated = session_id.is_some(),
        refreshed_cookies = resolution.cookies.len(),
        decision = ?decision,
        "Access decision"
    );

    let jar = resolution
        .cookies
        .iter()
        .cloned()
        .fold(jar, |jar, cookie| jar.add(cookie));

    match decision {
        AccessDecision::Redirect(target) => {
            (jar, Redirect::temporary(&target.location())).into_response()
        }
        AccessDecision::Continue => {
            echo_onto_request(request.headers_mut(), &resolution.cookies);
            if let Some(user) = resolution.user {
                // Admin pages only continue for admins.
                let role = (class == RouteClass::AdminPage).then_some(UserRole::Admin);
                request
                    .extensions_mut()
                    .insert(AuthUser::from_session(user, role));
            }
            let response = next.run(request).await;
            (jar, response).into_response()
        }
    }
}

async fn resolve_session(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> SessionResolution {
    if state.config.env == Env::Local {
        if let Some(user) = local_bypass(state, headers).await {
            return SessionResolution::authenticated(user);
        }
    }

    match state.identity.resolve(jar).await {
        Ok(resolution) => resolution,
        Err(e) => {
            tracing::warn!(error = %e, "Session resolution failed; continuing as anonymous");
            SessionResolution::anonymous()
        }
    }
}

/// local_bypass
///
/// Development shortcut: a known profile UUID in `x-user-id` stands in for a
/// session. The profile must exist so role checks still hit real data.
async fn local_bypass(state: &AppState, headers: &HeaderMap) -> Option<SessionUser> {
    let user_id = headers
        .get(DEV_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())?;

    let profile = state.repo.get_profile(user_id).await?;
    tracing::debug!(user_id = %profile.id, "Local development bypass");
    Some(SessionUser {
        id: profile.id,
        email: Some(profile.email),
    })
}

/// echo_onto_request
///
/// Rewrites the forwarded request's `Cookie` header so downstream handlers see
/// refreshed values. Only `name=value` travels this way; attributes such as
/// `Max-Age` or `Path` belong to the response and are not forwarded.
pub fn echo_onto_request(headers: &mut HeaderMap, updates: &[Cookie<'static>]) {
    if updates.is_empty() {
        return;
    }

    let mut pairs: Vec<(String, String)> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    for cookie in updates {
        match pairs.iter_mut().find(|(name, _)| name == cookie.name()) {
            Some(pair) => pair.1 = cookie.value().to_string(),
            None => pairs.push((cookie.name().to_string(), cookie.value().to_string())),
        }
    }

    let header = pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");

    headers.remove(COOKIE);
    match HeaderValue::from_str(&header) {
        Ok(value) => {
            headers.insert(COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Could not echo refreshed cookies onto request"),
    }
}
