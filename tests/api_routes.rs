//! HTTP surface tests driven through the full router with `oneshot`.

mod common;

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use botcast_gateway::routes;
use common::{fast_settings, test_app};

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let mut request = match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    request
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app("Frank", "Hello there", fast_settings());
    let router = routes::create_router(app.state);

    let response = router.oneshot(request("GET", "/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "OK"}));
}

#[tokio::test]
async fn test_characters_in_roster_order() {
    let app = test_app("Frank", "Hello there", fast_settings());
    let router = routes::create_router(app.state);

    let response = router
        .oneshot(request("GET", "/characters", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let characters = body["characters"].as_array().unwrap();
    assert_eq!(characters.len(), 2);
    assert_eq!(characters[0]["name"], "Joe Rogan");
    assert_eq!(characters[1]["name"], "Frank");
    assert_eq!(characters[1]["display_name"], "Frank Degods");
    assert_eq!(characters[1]["avatar_url"], "https://example.com/frank.png");
    assert_eq!(
        characters[1]["mouth_positions"]["open"],
        "https://example.com/frank-open.png"
    );
}

#[tokio::test]
async fn test_set_topic_queues_after_current() {
    let app = test_app("Frank", "Hello there", fast_settings());
    let router = routes::create_router(app.state);

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/set_topic",
            Some(json!({"topic": "Mars colonies"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["current_topic"], "AI");
    assert_eq!(body["topics"], json!(["AI", "Mars colonies", "Crypto"]));

    // Same topic again leaves the list alone
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/set_topic",
            Some(json!({"topic": "Mars colonies"})),
        ))
        .await
        .unwrap();
    assert_eq!(
        json_body(response).await["topics"],
        json!(["AI", "Mars colonies", "Crypto"])
    );

    let response = router
        .oneshot(request("GET", "/get_topics", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["cursor"], 0);
    assert_eq!(body["topics"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_set_topic_rejects_bad_input() {
    let app = test_app("Frank", "Hello there", fast_settings());
    let router = routes::create_router(app.state);

    let response = router
        .clone()
        .oneshot(request("POST", "/set_topic", Some(json!({"topic": "   "}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());

    let response = router
        .oneshot(request("POST", "/set_topic", Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_start_stop_cycle() {
    let app = test_app("Frank", "Hello there", fast_settings());
    let router = routes::create_router(app.state.clone());

    let response = router
        .clone()
        .oneshot(request("POST", "/session/start", None))
        .await
        .unwrap();
    assert_eq!(
        json_body(response).await,
        json!({"status": "started", "generation": 1})
    );

    let response = router
        .clone()
        .oneshot(request("POST", "/session/start", None))
        .await
        .unwrap();
    assert_eq!(
        json_body(response).await,
        json!({"status": "already_running", "generation": 1})
    );

    let response = router
        .clone()
        .oneshot(request("GET", "/session", None))
        .await
        .unwrap();
    let status = json_body(response).await;
    assert_eq!(status["active"], true);
    assert_eq!(status["current_topic"], "AI");

    let response = router
        .clone()
        .oneshot(request("POST", "/session/stop", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await, json!({"status": "stopped"}));

    let response = router
        .oneshot(request("POST", "/session/stop", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await, json!({"status": "not_running"}));
    assert!(!app.state.session.is_active());
}
