//! End-to-end failure cycle tests over real sockets.

use std::collections::HashMap;
use std::time::Duration;

use flaky_server::config::ServerConfig;

mod common;

#[tokio::test]
async fn test_sequence_over_http() {
    let server = common::start_server(common::cycle_config(2, 503, 1, 200)).await;
    let client = common::client();

    let mut statuses = Vec::new();
    for i in 0..6 {
        let res = client
            .get(server.url(&format!("/attempt/{i}")))
            .send()
            .await
            .expect("Server unreachable");
        statuses.push(res.status().as_u16());
    }

    assert_eq!(statuses, vec![503, 503, 200, 503, 503, 200]);
    server.shutdown.trigger();
}

#[tokio::test]
async fn test_success_only_cycle() {
    let mut config = common::cycle_config(0, 503, 3, 200);
    config.response.status_code = 200;
    let server = common::start_server(config).await;
    let client = common::client();

    for _ in 0..7 {
        let res = client.get(server.url("/")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
    server.shutdown.trigger();
}

#[tokio::test]
async fn test_empty_cycle_returns_default_code() {
    let mut config = common::cycle_config(0, 503, 0, 201);
    config.response.status_code = 418;
    let server = common::start_server(config).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client.post(server.url("/")).send().await.unwrap();
        assert_eq!(res.status(), 418);
    }
    server.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_see_exact_counts() {
    let server = common::start_server(common::cycle_config(4, 500, 1, 200)).await;
    let client = common::client();

    let concurrency = 10;
    let requests_per_task = 10;
    let mut handles = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = server.url("/");
        handles.push(tokio::spawn(async move {
            let mut statuses = Vec::new();
            for _ in 0..requests_per_task {
                let res = client.get(&url).send().await.unwrap();
                statuses.push(res.status().as_u16());
            }
            statuses
        }));
    }

    let mut counts: HashMap<u16, usize> = HashMap::new();
    for handle in handles {
        for status in handle.await.unwrap() {
            *counts.entry(status).or_default() += 1;
        }
    }

    // 100 requests = 20 full cycles of 4 failures + 1 success
    assert_eq!(counts.get(&500), Some(&80));
    assert_eq!(counts.get(&200), Some(&20));
    server.shutdown.trigger();
}

#[tokio::test]
async fn test_echo_and_request_id() {
    let mut config = ServerConfig::default();
    config.response.echo = true;
    let server = common::start_server(config).await;

    let res = common::client()
        .put(server.url("/echo"))
        .body("ping")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "ping");
    server.shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let server = common::start_server(ServerConfig::default()).await;
    let client = common::client();

    let res = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    server.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
