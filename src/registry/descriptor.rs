//! Immutable service descriptors.

use std::collections::BTreeSet;

use url::Url;

/// A downstream service as known to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Unique logical name.
    pub name: String,
    /// Base address; forwarded paths are appended to its path.
    pub base_url: Url,
    /// Names of services (or `store`) that must be ready first.
    pub depends_on: BTreeSet<String>,
    /// Concurrent dispatches allowed to this service.
    pub max_concurrency: usize,
}

impl ServiceDescriptor {
    /// Build the absolute URL for a forwarded path and optional query.
    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", base, path, q),
            _ => format!("{}{}", base, path),
        }
    }

    /// The `host:port` part of the base address, for logs and metrics.
    pub fn authority(&self) -> String {
        match (self.base_url.host_str(), self.base_url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => self.base_url.to_string(),
        }
    }
}
