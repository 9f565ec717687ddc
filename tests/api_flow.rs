mod common;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use common::*;
use http_body_util::BodyExt;
use scalpscan::web::{AppState, build_app};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn session_state(app: &Router, cookie: &str) -> Value {
    let request = Request::get("/api/session")
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    read_json(app.clone().oneshot(request).await.unwrap()).await
}

fn app_for(upstream: &FakeUpstream) -> Router {
    build_app(AppState::new(upstream.client(), 300), 8 * 1024 * 1024)
}

#[tokio::test]
async fn analyze_then_preview_then_failed_regeneration() {
    let upstream = FakeUpstream::start(vec![
        ok(text_response(&assessment_json())),
        ok(image_response("image/png", "iVBORw0KGgo=")),
        ok(finish_only("SAFETY")),
    ])
    .await;
    let app = app_for(&upstream);
    let photo = png(64, 48).to_data_uri();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/analyze",
            None,
            json!({"image": photo, "language": "en"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let assessment = read_json(response).await;
    assert_eq!(assessment["norwoodScale"], json!(3));
    assert_eq!(assessment["distribution"][1]["zone"], json!("Mid-scalp"));
    assert_eq!(session_state(&app, &cookie).await["state"], json!("results"));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/generate",
            Some(&cookie),
            json!({"image": photo, "style": "dense natural hairline"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({"image": "data:image/png;base64,iVBORw0KGgo="})
    );
    let state = session_state(&app, &cookie).await;
    assert_eq!(state["state"], json!("preview_ready"));
    assert_eq!(state["assessment"]["totalGrafts"], json!(2400));

    // regeneration blocked by safety falls back to results with the error attached
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/generate",
            Some(&cookie),
            json!({"image": photo, "style": "something else"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(body["kind"], json!("safety_block"));
    assert!(body["message"].as_str().unwrap().contains("different photo"));
    let state = session_state(&app, &cookie).await;
    assert_eq!(state["state"], json!("results"));
    assert_eq!(state["previewError"], json!("safety_block"));

    assert_eq!(upstream.hits(), 3);
}

#[tokio::test]
async fn quota_exhaustion_surfaces_generic_failure() {
    let upstream = FakeUpstream::start(vec![quota()]).await;
    let app = app_for(&upstream);

    let response = app
        .oneshot(post_json(
            "/api/analyze",
            None,
            json!({"image": png(8, 8).to_data_uri()}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json(response).await;
    assert_eq!(body["kind"], json!("quota_exceeded"));
    assert!(!body["message"].as_str().unwrap().contains("exhausted"));
    assert_eq!(upstream.hits(), 4);
}

#[tokio::test]
async fn reset_returns_session_to_idle() {
    let upstream = FakeUpstream::start(vec![ok(text_response(&assessment_json()))]).await;
    let app = app_for(&upstream);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/analyze",
            None,
            json!({"image": png(8, 8).to_data_uri(), "language": "tr"}),
        ))
        .await
        .unwrap();
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(post_json("/api/session/reset", Some(&cookie), json!({})))
        .await
        .unwrap();
    assert_eq!(read_json(response).await, json!({"state": "idle"}));
    assert_eq!(session_state(&app, &cookie).await, json!({"state": "idle"}));
}

#[tokio::test]
async fn undecodable_bodies_are_bad_requests() {
    let upstream = FakeUpstream::start(vec![ok(text_response(&assessment_json()))]).await;
    let app = app_for(&upstream);

    for body in [
        json!({"image": png(8, 8).to_data_uri(), "language": "de"}),
        json!({"language": "en"}),
    ] {
        let response = app
            .clone()
            .oneshot(post_json("/api/analyze", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["kind"], json!("bad_request"));
        let message = body["message"].as_str().unwrap();
        assert!(!message.contains("unknown variant"));
        assert!(!message.contains("missing field"));
    }

    let response = app
        .oneshot(post_json("/api/generate", None, json!({"image": 1})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["kind"], json!("bad_request"));
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn oversized_body_is_reported_as_json() {
    let upstream = FakeUpstream::start(vec![ok(text_response(&assessment_json()))]).await;
    let app = build_app(AppState::new(upstream.client(), 300), 1024);

    let response = app
        .oneshot(post_json(
            "/api/analyze",
            None,
            json!({"image": format!("data:image/png;base64,{}", "A".repeat(4096))}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(read_json(response).await["kind"], json!("payload_too_large"));
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn empty_inputs_leave_results_in_place() {
    let upstream = FakeUpstream::start(vec![ok(text_response(&assessment_json()))]).await;
    let app = app_for(&upstream);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/analyze",
            None,
            json!({"image": png(8, 8).to_data_uri()}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let empty_image = "data:image/jpeg;base64,";
    let requests = [
        ("/api/analyze", json!({"image": empty_image})),
        ("/api/generate", json!({"image": empty_image, "style": "crew cut"})),
        (
            "/api/generate",
            json!({"image": png(8, 8).to_data_uri(), "style": "   "}),
        ),
    ];
    for (uri, body) in requests {
        let response = app
            .clone()
            .oneshot(post_json(uri, Some(&cookie), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["kind"], json!("invalid_input"));

        let state = session_state(&app, &cookie).await;
        assert_eq!(state["state"], json!("results"));
        assert_eq!(state["assessment"]["norwoodScale"], json!(3));
    }
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn preview_failures_use_preview_wording() {
    let upstream = FakeUpstream::start(vec![
        ok(text_response(&assessment_json())),
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": {"code": 500, "message": "internal", "status": "INTERNAL"}}),
        ),
    ])
    .await;
    let app = app_for(&upstream);
    let photo = png(8, 8).to_data_uri();

    let response = app
        .clone()
        .oneshot(post_json("/api/analyze", None, json!({"image": photo})))
        .await
        .unwrap();
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/generate",
            Some(&cookie),
            json!({"image": photo, "style": "side part"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = read_json(response).await;
    assert_eq!(body["kind"], json!("upstream"));
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("preview"));
    assert!(!message.contains("internal"));
}
