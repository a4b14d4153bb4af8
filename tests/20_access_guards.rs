use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use evkin_api::auth::{generate_jwt, Claims};
use evkin_api::types::Role;

fn token(role: Role) -> String {
    generate_jwt(&Claims::new(Uuid::new_v4(), "tester".into(), role)).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn protected_route_without_token_is_unauthorized() {
    let response = evkin_api::app().oneshot(get("/api/laporan", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let response = evkin_api::app()
        .oneshot(get("/api/laporan", Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_unknown_account_never_reaches_handlers() {
    // A well-signed token is checked against the users table: without a
    // database the lookup answers 503 (500 before migrations), with one the
    // unknown id answers 401.
    for (uri, role) in [("/api/admin/verifikasi", Role::Admin), ("/api/reference/bulan", Role::Puskesmas)] {
        let response = evkin_api::app().oneshot(get(uri, Some(&token(role)))).await.unwrap();
        let status = response.status();
        assert!(
            status == StatusCode::UNAUTHORIZED
                || status == StatusCode::SERVICE_UNAVAILABLE
                || status == StatusCode::INTERNAL_SERVER_ERROR,
            "{} answered {}",
            uri,
            status
        );
        assert_eq!(json_body(response).await["success"], false);
    }
}

#[tokio::test]
async fn malformed_json_body_uses_error_envelope() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username": "pkm_a", "password": "#))
        .unwrap();
    let response = evkin_api::app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn body_without_json_content_type_uses_error_envelope() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .body(Body::from(r#"{"username": "pkm_a", "password": "secret"}"#))
        .unwrap();
    let response = evkin_api::app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], true);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let response = evkin_api::app().oneshot(get("/api/nope", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
