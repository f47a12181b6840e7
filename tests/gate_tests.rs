mod common;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use axum_extra::extract::cookie::Cookie;
use common::{MockIdentity, MockRepo, test_state};
use std::sync::{Arc, atomic::Ordering};
use tower::ServiceExt;
use uuid::Uuid;
use villa_portal::{
    AppConfig, create_router,
    config::Env,
    gate::{DEV_USER_HEADER, echo_onto_request},
    models::{Profile, UserRole},
};

// --- Helpers ---

async fn send(
    repo: Arc<MockRepo>,
    identity: Arc<MockIdentity>,
    request: Request<Body>,
) -> axum::response::Response {
    let app = create_router(test_state(repo, identity));
    app.oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok().map(str::to_string))
        .collect()
}

fn refreshed_cookie() -> Cookie<'static> {
    Cookie::build(("sb-localhost-auth-token", "base64-eyJmcmVzaCI6dHJ1ZX0"))
        .path("/")
        .build()
}

// --- Redirect Policy ---

#[tokio::test]
async fn test_anonymous_dashboard_redirects_to_signin() {
    let response = send(
        Arc::new(MockRepo::default()),
        Arc::new(MockIdentity::anonymous()),
        get("/dashboard/bookings"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/signin?redirectTo=%2Fdashboard%2Fbookings");
}

#[tokio::test]
async fn test_signin_redirect_keeps_original_query() {
    let response = send(
        Arc::new(MockRepo::default()),
        Arc::new(MockIdentity::anonymous()),
        get("/admin/bookings?page=2&redirectTo=%2Fevil"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "/signin?page=2&redirectTo=%2Fadmin%2Fbookings"
    );
}

#[tokio::test]
async fn test_signed_in_visitor_is_sent_away_from_auth_pages() {
    let identity = Arc::new(MockIdentity::signed_in(Uuid::new_v4()));
    for path in ["/signin", "/signup", "/auth/callback"] {
        let response = send(Arc::new(MockRepo::default()), identity.clone(), get(path)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(location(&response), "/dashboard", "{path}");
    }
}

#[tokio::test]
async fn test_anonymous_visitor_reaches_signin_page() {
    let response = send(
        Arc::new(MockRepo::default()),
        Arc::new(MockIdentity::anonymous()),
        get("/signin?redirectTo=%2Fdashboard"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["page"], "signin");
    assert_eq!(json["redirect_to"], "/dashboard");
}

#[tokio::test]
async fn test_customer_on_admin_page_goes_to_dashboard() {
    let repo = Arc::new(MockRepo {
        role: Some(UserRole::Customer),
        ..Default::default()
    });
    let response = send(
        repo.clone(),
        Arc::new(MockIdentity::signed_in(Uuid::new_v4())),
        get("/admin/stats"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/dashboard");
    assert_eq!(repo.role_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_profile_fails_closed() {
    let repo = Arc::new(MockRepo::default());
    let response = send(
        repo.clone(),
        Arc::new(MockIdentity::signed_in(Uuid::new_v4())),
        get("/admin"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_admin_reaches_admin_handler() {
    let repo = Arc::new(MockRepo {
        role: Some(UserRole::Admin),
        ..Default::default()
    });
    let response = send(
        repo.clone(),
        Arc::new(MockIdentity::signed_in(Uuid::new_v4())),
        get("/admin/stats"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(repo.role_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_role_is_not_looked_up_outside_admin_pages() {
    let repo = Arc::new(MockRepo::default());
    let identity = Arc::new(MockIdentity::signed_in(Uuid::new_v4()));
    for path in ["/dashboard", "/villas", "/health"] {
        let response = send(repo.clone(), identity.clone(), get(path)).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
    assert_eq!(repo.role_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_identity_failure_is_treated_as_anonymous() {
    let identity = Arc::new(MockIdentity {
        fail: true,
        ..Default::default()
    });

    let protected = send(Arc::new(MockRepo::default()), identity.clone(), get("/dashboard")).await;
    assert_eq!(protected.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&protected), "/signin?redirectTo=%2Fdashboard");

    let public = send(Arc::new(MockRepo::default()), identity, get("/health")).await;
    assert_eq!(public.status(), StatusCode::OK);
}

// --- Static Assets ---

#[tokio::test]
async fn test_static_assets_bypass_the_gate() {
    let identity = Arc::new(MockIdentity {
        cookies: vec![refreshed_cookie()],
        ..MockIdentity::anonymous()
    });

    for path in [
        "/_next/static/chunks/app.js",
        "/_next/image?url=x",
        "/favicon.ico",
        "/images/hero.webp",
        "/dashboard/logo.svg",
    ] {
        let response = send(Arc::new(MockRepo::default()), identity.clone(), get(path)).await;
        // Not redirected, even under /dashboard; the router answers 404.
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        assert!(set_cookies(&response).is_empty(), "{path}");
    }
    assert_eq!(identity.calls(), 0);
}

#[tokio::test]
async fn test_unknown_paths_still_pass_through_the_gate() {
    let identity = Arc::new(MockIdentity::anonymous());
    let response = send(Arc::new(MockRepo::default()), identity.clone(), get("/nowhere")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(identity.calls(), 1);
}

// --- Cookie Propagation ---

#[tokio::test]
async fn test_refreshed_cookies_reach_the_continued_response() {
    let identity = Arc::new(MockIdentity {
        cookies: vec![refreshed_cookie()],
        ..MockIdentity::signed_in(Uuid::new_v4())
    });
    let response = send(Arc::new(MockRepo::default()), identity, get("/dashboard")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("sb-localhost-auth-token=base64-"));
}

#[tokio::test]
async fn test_refreshed_cookies_reach_the_redirect_response() {
    let identity = Arc::new(MockIdentity {
        cookies: vec![refreshed_cookie()],
        ..MockIdentity::signed_in(Uuid::new_v4())
    });
    let response = send(Arc::new(MockRepo::default()), identity, get("/signin")).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(set_cookies(&response).len(), 1);
}

#[tokio::test]
async fn test_cleared_session_cookies_reach_the_signin_redirect() {
    let removal = Cookie::build(("sb-localhost-auth-token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    let identity = Arc::new(MockIdentity {
        cookies: vec![removal],
        ..MockIdentity::anonymous()
    });
    let response = send(Arc::new(MockRepo::default()), identity, get("/dashboard")).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].contains("Max-Age=0"));
}

#[test]
fn test_echo_replaces_and_appends_request_cookies() {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        "theme=dark; sb-localhost-auth-token=old".parse().unwrap(),
    );

    echo_onto_request(
        &mut headers,
        &[
            Cookie::new("sb-localhost-auth-token", "new"),
            Cookie::new("sb-localhost-auth-token.1", ""),
        ],
    );

    assert_eq!(
        headers.get(header::COOKIE).unwrap(),
        "theme=dark; sb-localhost-auth-token=new; sb-localhost-auth-token.1="
    );
}

#[test]
fn test_echo_without_updates_leaves_headers_alone() {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, "theme=dark".parse().unwrap());
    echo_onto_request(&mut headers, &[]);
    assert_eq!(headers.get(header::COOKIE).unwrap(), "theme=dark");
}

// --- Local Development Bypass ---

#[tokio::test]
async fn test_dev_header_acts_as_known_profile_in_local_mode() {
    let user_id = Uuid::new_v4();
    let repo = Arc::new(MockRepo {
        profile: Some(Profile {
            id: user_id,
            email: "dev@example.com".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    });
    let identity = Arc::new(MockIdentity::anonymous());

    let request = Request::builder()
        .uri("/dashboard")
        .header(DEV_USER_HEADER, user_id.to_string())
        .body(Body::empty())
        .unwrap();
    let response = send(repo, identity.clone(), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(identity.calls(), 0);
}

#[tokio::test]
async fn test_dev_header_for_unknown_profile_is_ignored() {
    let request = Request::builder()
        .uri("/dashboard")
        .header(DEV_USER_HEADER, Uuid::new_v4().to_string())
        .body(Body::empty())
        .unwrap();
    let response = send(
        Arc::new(MockRepo::default()),
        Arc::new(MockIdentity::anonymous()),
        request,
    )
    .await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_dev_header_is_ignored_outside_local_mode() {
    let admin_id = Uuid::new_v4();
    let repo = Arc::new(MockRepo {
        role: Some(UserRole::Admin),
        profile: Some(Profile {
            id: admin_id,
            email: "admin@example.com".to_string(),
            user_role: UserRole::Admin,
            ..Default::default()
        }),
        ..Default::default()
    });
    let identity = Arc::new(MockIdentity::anonymous());
    let mut state = test_state(repo.clone(), identity.clone());
    state.config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };

    let request = Request::builder()
        .uri("/admin/stats")
        .header(DEV_USER_HEADER, admin_id.to_string())
        .body(Body::empty())
        .unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/signin?redirectTo=%2Fadmin%2Fstats");
    // The cookie session is the only source of identity.
    assert_eq!(identity.calls(), 1);
    assert_eq!(repo.role_lookups.load(Ordering::SeqCst), 0);
}
