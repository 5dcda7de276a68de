//! Admission pipeline behavior over the HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gatewarden::http::{AppState, HttpServer};
use gatewarden::store::{ClientConfig, MemoryClientStore};
use gatewarden::{Backend, BackendPool, Dispatcher, RateLimiter, Shutdown};

mod common;

/// Boot the full pipeline against one mock backend. Returns the proxy
/// address; the shutdown handle keeps the server alive for the test.
async fn start_proxy(clients: Vec<ClientConfig>) -> (SocketAddr, Shutdown) {
    let backend_addr = common::spawn_ok_backend("upstream says hi").await;
    let pool = Arc::new(BackendPool::new());
    pool.add(Arc::new(Backend::new(common::backend_url(backend_addr))));

    let store = Arc::new(MemoryClientStore::with_clients(clients));
    let limiter = Arc::new(RateLimiter::new(store).await.unwrap());
    limiter.spawn_refill();

    let state = AppState {
        limiter,
        dispatcher: Arc::new(Dispatcher::new(pool)),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = HttpServer::new(state).run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

fn client(id: &str, capacity: u32, rate: f64) -> ClientConfig {
    ClientConfig {
        client_id: id.to_string(),
        capacity,
        rate_per_sec: rate,
    }
}

#[tokio::test]
async fn missing_client_id_is_bad_request() {
    let (addr, _shutdown) = start_proxy(vec![]).await;
    let res = reqwest::get(format!("http://{}/", addr)).await.unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn unknown_client_is_rate_limited() {
    let (addr, _shutdown) = start_proxy(vec![]).await;
    let res = reqwest::get(format!("http://{}/?client_id=stranger", addr))
        .await
        .unwrap();
    assert_eq!(res.status(), 429);
}

#[tokio::test]
async fn admitted_request_reaches_backend() {
    let (addr, _shutdown) = start_proxy(vec![client("tenant", 5, 1.0)]).await;
    let res = reqwest::get(format!("http://{}/?client_id=tenant", addr))
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "upstream says hi");
}

#[tokio::test]
async fn quota_exhaustion_returns_429_until_refill() {
    let (addr, _shutdown) = start_proxy(vec![client("tenant", 2, 2.0)]).await;
    let url = format!("http://{}/?client_id=tenant", addr);

    assert_eq!(reqwest::get(&url).await.unwrap().status(), 200);
    assert_eq!(reqwest::get(&url).await.unwrap().status(), 200);
    assert_eq!(reqwest::get(&url).await.unwrap().status(), 429);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(reqwest::get(&url).await.unwrap().status(), 200);
}

#[tokio::test]
async fn client_crud_over_http() {
    let (addr, _shutdown) = start_proxy(vec![]).await;
    let http = reqwest::Client::new();
    let base = format!("http://{}", addr);

    // Create, then the new client is admitted immediately.
    let res = http
        .post(format!("{}/clients", base))
        .json(&client("acme", 3, 1.0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    let res = reqwest::get(format!("{}/?client_id=acme", base)).await.unwrap();
    assert_eq!(res.status(), 200);

    // Duplicate create is a store conflict, surfaced as 500.
    let res = http
        .post(format!("{}/clients", base))
        .json(&client("acme", 3, 1.0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);

    // Update succeeds and applies without restart.
    let res = http
        .put(format!("{}/clients", base))
        .json(&client("acme", 10, 5.0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // Delete, after which the client is denied again.
    let res = http
        .delete(format!("{}/clients/acme", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = reqwest::get(format!("{}/?client_id=acme", base)).await.unwrap();
    assert_eq!(res.status(), 429);
}

#[tokio::test]
async fn negative_rate_is_bad_request() {
    let (addr, _shutdown) = start_proxy(vec![]).await;
    let res = reqwest::Client::new()
        .post(format!("http://{}/clients", addr))
        .json(&client("neg", 5, -100.0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn malformed_client_body_is_bad_request() {
    let (addr, _shutdown) = start_proxy(vec![]).await;
    let res = reqwest::Client::new()
        .post(format!("http://{}/clients", addr))
        .header("content-type", "application/json")
        .body("{\"client_id\": 42}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}
