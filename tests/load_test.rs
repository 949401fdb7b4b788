//! Load testing for the gateway.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::net::TcpListener;

use service_gateway::{HttpServer, Shutdown};

mod common;
use common::{gateway_config, MockBackend, TestStore};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_performance() {
    // 1. Setup mock backend
    let user = MockBackend::start("user").await;

    // 2. Setup gateway config
    let mut config = gateway_config(&[("user", &[], &user)], &[("/api/users", "user")]);
    config.retries.enabled = false;
    config.dispatch.max_concurrency_per_backend = 64;

    // 3. Start gateway
    let server = HttpServer::new(config, TestStore::new(true)).unwrap();
    server.coordinator().run_round().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = server.run(listener, &shutdown).await;
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // 4. Run load test
    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let ok = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let tasks = (0..concurrency).map(|task| {
        let client = client.clone();
        let ok = ok.clone();
        tokio::spawn(async move {
            for i in 0..requests_per_task {
                let url = format!("http://{}/api/users/{}-{}", addr, task, i);
                if let Ok(res) = client.get(url).send().await {
                    if res.status().is_success() {
                        ok.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        })
    });
    join_all(tasks).await;

    let elapsed = start.elapsed();
    let rps = total_requests as f64 / elapsed.as_secs_f64();
    println!("Load test: {} requests in {:?} ({:.0} req/s)", total_requests, elapsed, rps);

    // 5. Verify
    assert_eq!(ok.load(Ordering::Relaxed), total_requests);
    assert_eq!(user.calls(), total_requests);

    shutdown.trigger();
    let _ = server_task.await;
}
