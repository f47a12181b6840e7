mod common;

use common::{MockIdentity, MockRepo, test_state};
use reqwest::{StatusCode, redirect::Policy};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;
use villa_portal::{
    create_router,
    gate::DEV_USER_HEADER,
    models::{Profile, UserRole},
};

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

// Serves the full router on an ephemeral port. Redirects are not followed so
// the gate's answers can be inspected.
async fn spawn_app(repo: MockRepo, identity: MockIdentity) -> TestApp {
    let router = create_router(test_state(Arc::new(repo), Arc::new(identity)));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap();

    TestApp { address, client }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app(MockRepo::default(), MockIdentity::anonymous()).await;
    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app(MockRepo::default(), MockIdentity::anonymous()).await;
    let doc: serde_json::Value = app
        .client
        .get(format!("{}/api-docs/openapi.json", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"]["/villas/{id}/availability"].is_object());
    assert!(doc["paths"]["/admin/bookings/{id}/status"].is_object());
}

#[tokio::test]
async fn test_admin_journey_with_dev_header() {
    let admin_id = Uuid::new_v4();
    let repo = MockRepo {
        role: Some(UserRole::Admin),
        profile: Some(Profile {
            id: admin_id,
            email: "admin@example.com".to_string(),
            user_role: UserRole::Admin,
            ..Default::default()
        }),
        ..Default::default()
    };
    let app = spawn_app(repo, MockIdentity::anonymous()).await;

    // Without a session the admin page sends the visitor to sign in.
    let anonymous = app
        .client
        .get(format!("{}/admin/stats", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        anonymous.headers()["location"],
        "/signin?redirectTo=%2Fadmin%2Fstats"
    );

    // The development header stands in for the session.
    let stats = app
        .client
        .get(format!("{}/admin/stats", app.address))
        .header(DEV_USER_HEADER, admin_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(stats.status(), StatusCode::OK);
    let body: serde_json::Value = stats.json().await.unwrap();
    assert_eq!(body["revenue_label"], "0,00\u{A0}€");

    // And, being signed in, the sign-in page is skipped.
    let signin = app
        .client
        .get(format!("{}/signin", app.address))
        .header(DEV_USER_HEADER, admin_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(signin.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(signin.headers()["location"], "/dashboard");
}

#[tokio::test]
async fn test_availability_validation_over_http() {
    let app = spawn_app(
        MockRepo {
            availability: Some(false),
            ..Default::default()
        },
        MockIdentity::anonymous(),
    )
    .await;
    let url = format!("{}/villas/{}/availability", app.address, Uuid::new_v4());

    let taken = app
        .client
        .post(&url)
        .json(&serde_json::json!({
            "package_id": Uuid::new_v4(),
            "start_date": "2025-07-01",
            "end_date": "2025-07-08"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(taken.status(), StatusCode::OK);
    let body: serde_json::Value = taken.json().await.unwrap();
    assert_eq!(body["available"], false);
    assert_eq!(body["nights"], 7);

    let inverted = app
        .client
        .post(&url)
        .json(&serde_json::json!({
            "package_id": Uuid::new_v4(),
            "start_date": "2025-07-08",
            "end_date": "2025-07-01"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(inverted.status(), StatusCode::BAD_REQUEST);
}
