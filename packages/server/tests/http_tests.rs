#![allow(clippy::disallowed_methods)]

use std::error::Error;
use std::time::Duration;

use api::{Bridge, BridgeConfig, init_bridge};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn setup() -> Result<(Bridge, Router), Box<dyn Error>> {
    let bridge = init_bridge(&BridgeConfig::default()).await?;
    let app = server::router(&bridge);
    Ok((bridge, app))
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value), Box<dyn Error>> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn post(route: &str, body: &str) -> Result<Request<Body>, Box<dyn Error>> {
    Ok(Request::builder()
        .method("POST")
        .uri(format!("/dispatch/{}", route))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?)
}

#[tokio::test]
async fn test_healthz() -> Result<(), Box<dyn Error>> {
    let (bridge, app) = setup().await?;

    let request = Request::builder().uri("/healthz").body(Body::empty())?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_dispatch_with_empty_body() -> Result<(), Box<dyn Error>> {
    let (bridge, app) = setup().await?;

    let (status, body) = send(&app, post("list_routes", "")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["routes"]
        .as_array()
        .is_some_and(|routes| routes.contains(&json!("healthz"))));

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_dispatch_errors_map_to_status() -> Result<(), Box<dyn Error>> {
    let (bridge, app) = setup().await?;

    let (status, body) = send(&app, post("nope", "{}")?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "route_not_found");
    assert_eq!(body["route"], "nope");

    let (status, body) = send(&app, post("register_hypothesis", r#"{"text": ""}"#)?).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "route_execution_error");

    let (status, body) = send(&app, post("job_status", r#"{"job_id": "unknown"}"#)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "job_not_found");

    let (status, _) = send(&app, post("healthz", "{not json")?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_register_then_rank_over_http() -> Result<(), Box<dyn Error>> {
    let (bridge, app) = setup().await?;

    let (status, created) = send(
        &app,
        post("register_hypothesis", r#"{"text": "Bees favour blue flowers"}"#)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let id = created["hypothesis_id"].as_str().ok_or("missing id")?;

    let (_, ranked) = send(&app, post("rank_hypotheses_by_confidence", "")?).await?;
    assert_eq!(ranked["ranking"][0]["hypothesis_id"], json!(id));

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_events_stream_hook_events() -> Result<(), Box<dyn Error>> {
    let (bridge, app) = setup().await?;

    let request = Request::builder().uri("/events").body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body().into_data_stream();

    bridge
        .dispatch_route("register_hypothesis", json!({"text": "Owls hunt at dusk"}))
        .await?;

    let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await?
        .ok_or("event stream ended")??;
    let text = String::from_utf8(chunk.to_vec())?;
    assert!(text.contains("event: hook"));
    assert!(text.contains("hypothesis_registered"));

    bridge.shutdown().await;
    Ok(())
}
