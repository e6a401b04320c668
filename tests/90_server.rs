mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{new_user, TestServer};

#[tokio::test]
async fn serves_over_http() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/events", server.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await?, json!({ "error": "Unauthorized" }));

    let token = server.app.token_for(new_user());
    let res = client
        .post(format!("{}/events", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "kind": "click", "payload": { "x": 1 } }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let created = res.json::<Value>().await?;

    let listed = client
        .get(format!("{}/events?limit=10", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(listed, json!([created]));
    Ok(())
}
