//! End-to-end routing tests: real listener, real upstreams.

use std::sync::Arc;

use axum::http::StatusCode;
use proxyutil::http::Outcome;

mod common;
use common::MemorySink;

#[tokio::test]
async fn test_forwards_and_strips_subpath() {
    let api = common::start_echo_upstream("api").await;
    let sink = Arc::new(MemorySink::default());
    let proxy = common::start_proxy(&[format!("/api:http://{}", api)], sink.clone()).await;

    let res = common::client()
        .get(format!("http://{}/api/users?page=2", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "api GET /users?page=2");

    let records = sink.wait_for(1).await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, Some(StatusCode::OK));
    assert_eq!(record.subpath.as_deref(), Some("/api"));
    assert_eq!(record.remote_ip, "127.0.0.1");
    assert_eq!(record.outcome, Outcome::Completed);
    assert!(record.uri.ends_with("/api/users?page=2"));
    assert!(record.request_id.is_some());
}

#[tokio::test]
async fn test_upstream_base_path_and_query_are_kept() {
    let svc = common::start_echo_upstream("svc").await;
    let sink = Arc::new(MemorySink::default());
    let proxy = common::start_proxy(
        &[format!("/svc:http://{}/base?token=abc", svc)],
        sink.clone(),
    )
    .await;

    let body = common::client()
        .post(format!("http://{}/svc/items?x=1", proxy))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "svc POST /base/items?token=abc&x=1");

    // The bare subpath reaches the upstream base path.
    let body = common::client()
        .get(format!("http://{}/svc", proxy))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "svc GET /base?token=abc");
}

#[tokio::test]
async fn test_longest_subpath_wins() {
    let outer = common::start_echo_upstream("outer").await;
    let inner = common::start_echo_upstream("inner").await;
    let sink = Arc::new(MemorySink::default());
    let proxy = common::start_proxy(
        &[
            format!("/a:http://{}", outer),
            format!("/a/b:http://{}", inner),
        ],
        sink.clone(),
    )
    .await;
    let client = common::client();

    let body = client
        .get(format!("http://{}/a/b/c", proxy))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "inner GET /c");

    let body = client
        .get(format!("http://{}/a/c", proxy))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "outer GET /c");

    // Segment boundaries matter: /ab is not under /a.
    let res = client.get(format!("http://{}/ab", proxy)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_subpath_last_one_wins() {
    let first = common::start_echo_upstream("first").await;
    let second = common::start_echo_upstream("second").await;
    let sink = Arc::new(MemorySink::default());
    let proxy = common::start_proxy(
        &[
            format!("/dup:http://{}", first),
            format!("/dup:http://{}", second),
        ],
        sink.clone(),
    )
    .await;

    let body = common::client()
        .get(format!("http://{}/dup/x", proxy))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "second GET /x");
}

#[tokio::test]
async fn test_catch_all_subpath() {
    let root = common::start_echo_upstream("root").await;
    let api = common::start_echo_upstream("api").await;
    let sink = Arc::new(MemorySink::default());
    let proxy = common::start_proxy(
        &[format!(":http://{}", root), format!("/api:http://{}", api)],
        sink.clone(),
    )
    .await;
    let client = common::client();

    let body = client
        .get(format!("http://{}/anything/else", proxy))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "root GET /anything/else");

    let body = client
        .get(format!("http://{}/api/v1", proxy))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "api GET /v1");
}

#[tokio::test]
async fn test_unmatched_path_is_recorded() {
    let api = common::start_echo_upstream("api").await;
    let sink = Arc::new(MemorySink::default());
    let proxy = common::start_proxy(&[format!("/api:http://{}", api)], sink.clone()).await;

    let res = common::client()
        .get(format!("http://{}/nowhere", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "404 page not found");

    let records = sink.wait_for(1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, Some(StatusCode::NOT_FOUND));
    assert_eq!(records[0].subpath, None);
}

#[tokio::test]
async fn test_forwarding_headers_reach_upstream() {
    let api = common::start_echo_upstream("api").await;
    let sink = Arc::new(MemorySink::default());
    let proxy = common::start_proxy(&[format!("/api:http://{}", api)], sink.clone()).await;

    let res = common::client()
        .get(format!("http://{}/api/", proxy))
        .header("x-forwarded-for", "10.9.8.7")
        .header("x-request-id", "trace-me")
        .header("connection", "x-custom-hop")
        .header("x-custom-hop", "secret")
        .send()
        .await
        .unwrap();

    let seen = |name: &str| res.headers()[name].to_str().unwrap().to_string();
    assert_eq!(seen("x-seen-forwarded-for"), "10.9.8.7, 127.0.0.1");
    assert!(seen("x-seen-via").contains("1.1 proxyutil"));
    assert_eq!(seen("x-seen-host"), api.to_string());
    assert_eq!(seen("x-seen-request-id"), "trace-me");
    assert_eq!(seen("x-seen-custom-hop"), "");
    assert_eq!(res.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_large_body_streams_both_ways() {
    let mirror = common::start_mirror_upstream().await;
    let sink = Arc::new(MemorySink::default());
    let proxy = common::start_proxy(&[format!("/echo:http://{}", mirror)], sink.clone()).await;

    let payload = vec![b'z'; 4 * 1024 * 1024];
    let res = common::client()
        .post(format!("http://{}/echo", proxy))
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.bytes().await.unwrap();
    assert_eq!(body.len(), payload.len());

    let records = sink.wait_for(1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].bytes, payload.len() as u64);
    assert_eq!(records[0].outcome, Outcome::Completed);
}
