//! End-to-end tests through the HTTP listener.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use service_gateway::{GatewayConfig, HttpServer, Shutdown};

mod common;
use common::{gateway_config, MockBackend, TestStore};

struct RunningGateway {
    addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl RunningGateway {
    async fn start(config: GatewayConfig) -> Self {
        let server = HttpServer::new(config, TestStore::new(true)).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();

        let task = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                server.run(listener, &shutdown).await.unwrap();
            })
        };

        Self { addr, shutdown, task }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn wait_ready(&self, client: &reqwest::Client) {
        for _ in 0..100 {
            if let Ok(res) = client.get(self.url("/ready")).send().await {
                if res.status() == 200 {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("gateway never became ready");
    }

    async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server did not drain")
            .unwrap();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn proxies_and_serves_gateway_endpoints() {
    let user = MockBackend::start("user").await;
    let order = MockBackend::start("order").await;
    let config = gateway_config(
        &[("user", &["store"], &user), ("order", &["user"], &order)],
        &[("/api/users", "user"), ("/api/orders", "order")],
    );
    let gateway = RunningGateway::start(config).await;
    let client = client();

    gateway.wait_ready(&client).await;

    let res = client
        .get(gateway.url("/api/users/42?fields=name"))
        .header("x-request-id", "trace-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-backend"], "user");
    assert_eq!(res.headers()["x-request-id"], "trace-123");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/api/users/42?fields=name");

    let seen = user.last_request().unwrap();
    assert_eq!(seen.headers["x-request-id"], "trace-123");
    assert_eq!(seen.headers["x-forwarded-for"], "127.0.0.1");
    assert_eq!(seen.headers["x-forwarded-proto"], "http");
    assert_eq!(seen.headers["x-forwarded-host"], gateway.addr.to_string().as_str());

    // Generated when the client sends none.
    let res = client.get(gateway.url("/api/orders/7")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let res = client.get(gateway.url("/api/unknown")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Not Found");

    let info: Value = client.get(gateway.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(info["healthcheck"], "/health");

    let health: Value = client.get(gateway.url("/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["store"], "reachable");
    assert_eq!(health["services"]["user"], "ready");
    assert_eq!(health["services"]["order"], "ready");

    let docs: Value = client.get(gateway.url("/api-docs")).send().await.unwrap().json().await.unwrap();
    assert_eq!(docs["routes"].as_array().unwrap().len(), 2);

    gateway.stop().await;
}

#[tokio::test]
async fn not_ready_gateway_reports_pending_services() {
    let user = MockBackend::start("user").await;
    user.set_healthy(false);
    let config = gateway_config(&[("user", &["store"], &user)], &[("/api/users", "user")]);
    let gateway = RunningGateway::start(config).await;
    let client = client();

    tokio::time::sleep(Duration::from_millis(150)).await;
    let res = client.get(gateway.url("/ready")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["pending"][0], "user");

    let res = client.get(gateway.url("/api/users/1")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Service Unavailable");
    assert_eq!(user.calls(), 0);

    gateway.stop().await;
}

#[tokio::test]
async fn slow_backend_yields_gateway_timeout() {
    let payment = MockBackend::start("payment").await;
    let mut config = gateway_config(&[("payment", &[], &payment)], &[("/api/payments", "payment")]);
    config.timeouts.request_ms = 200;
    let gateway = RunningGateway::start(config).await;
    let client = client();
    gateway.wait_ready(&client).await;

    payment.set_delay(Duration::from_secs(2));
    let res = client.post(gateway.url("/api/payments")).body("{}").send().await.unwrap();
    assert_eq!(res.status(), 504);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Gateway Timeout");

    gateway.stop().await;
}

#[tokio::test]
async fn oversized_request_body_is_payload_too_large() {
    let order = MockBackend::start("order").await;
    let mut config = gateway_config(&[("order", &[], &order)], &[("/api/orders", "order")]);
    config.security.max_body_size = 16;
    let gateway = RunningGateway::start(config).await;
    let client = client();
    gateway.wait_ready(&client).await;

    let res = client
        .post(gateway.url("/api/orders"))
        .body(vec![b'x'; 64])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);
    assert_eq!(order.calls(), 0);

    gateway.stop().await;
}

#[tokio::test]
async fn status_endpoints_answer_while_dispatch_is_saturated() {
    let payment = MockBackend::start("payment").await;
    let mut config = gateway_config(&[("payment", &[], &payment)], &[("/api/payments", "payment")]);
    config.listener.max_connections = 1;
    let gateway = RunningGateway::start(config).await;
    let client = client();
    gateway.wait_ready(&client).await;

    payment.set_delay(Duration::from_millis(800));
    let slow = {
        let client = client.clone();
        let url = gateway.url("/api/payments/1");
        tokio::spawn(async move { client.get(url).send().await.unwrap().status() })
    };
    for _ in 0..100 {
        if payment.calls() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(payment.calls(), 1);

    let ready = tokio::time::timeout(Duration::from_millis(300), client.get(gateway.url("/ready")).send())
        .await
        .expect("/ready queued behind dispatched traffic")
        .unwrap();
    assert_eq!(ready.status(), 200);

    let health = tokio::time::timeout(Duration::from_millis(300), client.get(gateway.url("/health")).send())
        .await
        .expect("/health queued behind dispatched traffic")
        .unwrap();
    assert_eq!(health.status(), 200);

    assert_eq!(slow.await.unwrap(), 200);
    gateway.stop().await;
}
