//! Active health probing.
//!
//! # Responsibilities
//! - Probe one backend's health endpoint
//! - Report healthy (2xx) or not; callers decide the state change

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request};
use tokio::time;

use crate::config::StartupConfig;
use crate::registry::ServiceDescriptor;
use crate::upstream::HttpClient;

/// Issues `GET <base><path>` probes.
#[derive(Debug, Clone)]
pub struct HealthProber {
    client: HttpClient,
    path: String,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(client: HttpClient, config: &StartupConfig) -> Self {
        Self {
            client,
            path: config.health_path.clone(),
            timeout: Duration::from_millis(config.probe_timeout_ms),
        }
    }

    /// True if the backend answered 2xx within the probe timeout.
    pub async fn probe(&self, service: &ServiceDescriptor) -> bool {
        let uri = service.url_for(&self.path, None);

        let request = match Request::builder()
            .method("GET")
            .uri(&uri)
            .header(header::USER_AGENT, "service-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(service = %service.name, error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::debug!(service = %service.name, status = %response.status(), "Health check failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::debug!(service = %service.name, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(service = %service.name, "Health check failed: timeout");
                false
            }
        }
    }
}
