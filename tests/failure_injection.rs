//! Malformed and out-of-order requests.

use reqwest::StatusCode;
use soulgrid::ServerConfig;

mod common;

async fn details(res: reqwest::Response) -> String {
    let body: serde_json::Value = res.json().await.unwrap();
    body["details"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_paint_before_register() {
    let server = common::start_server(ServerConfig::default()).await;

    let res = common::paint(&server, "192.0.2.9", 0, 0, "red").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_paint_validation() {
    let server = common::start_server(ServerConfig::default()).await;
    common::register_grid(&server, "192.0.2.1", 2, 2).await;

    let res = common::paint(&server, "192.0.2.9", 0, 0, "magenta").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(details(res).await, "invalid color");

    let res = common::paint(&server, "192.0.2.9", -1, 0, "red").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(details(res).await, "invalid x/y");

    let res = common::client()
        .post(server.url("/api/pixels/paint"))
        .header("x-forwarded-for", "192.0.2.9")
        .header("content-type", "application/json")
        .body("{\"x\": 1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(details(res).await, "invalid form");

    // Rejected requests must not consume quota.
    let me: serde_json::Value = common::client()
        .get(server.url("/api/souls/me"))
        .header("x-forwarded-for", "192.0.2.9")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["painted_pixels"], 0);
}

#[tokio::test]
async fn test_paint_unknown_cell_keeps_quota() {
    let server = common::start_server(ServerConfig::default()).await;
    common::register_grid(&server, "192.0.2.1", 2, 2).await;

    let res = common::paint(&server, "192.0.2.9", 50, 50, "blue").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let me: serde_json::Value = common::client()
        .get(server.url("/api/souls/me"))
        .header("x-forwarded-for", "192.0.2.9")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["painted_pixels"], 0);
    assert_eq!(me["remaining"], 10);
}

#[tokio::test]
async fn test_register_validation() {
    let mut config = ServerConfig::default();
    config.grid.max_register_cells = 4;
    let server = common::start_server(config).await;

    let res = common::client()
        .post(server.url("/api/pixels/register"))
        .json(&serde_json::json!({ "pixels": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = common::client()
        .post(server.url("/api/pixels/register"))
        .json(&serde_json::json!({ "pixels": [{ "x": 0, "y": -3 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = common::register_grid(&server, "192.0.2.1", 3, 3).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing above initialized the grid.
    let res = common::register_grid(&server, "192.0.2.1", 2, 2).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_souls_page_must_be_positive_int() {
    let server = common::start_server(ServerConfig::default()).await;

    for query in ["page=0", "page=-2", "page=abc"] {
        let res = common::client()
            .get(server.url(&format!("/api/souls?{query}")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY, "{query}");
    }
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = ServerConfig::default();
    config.listener.max_body_bytes = 64;
    let server = common::start_server(config).await;

    let res = common::register_grid(&server, "192.0.2.1", 20, 20).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(details(res).await, "request body too large");

    let res = common::register_grid(&server, "192.0.2.1", 1, 1).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}
