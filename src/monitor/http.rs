//! HTTP/JSON monitor client
//!
//! Routes:
//! - `POST /v1/nodes`              register (idempotent by node name)
//! - `GET  /v1/nodes/{node_name}`  identity, 404 when unknown
//! - `GET  /v1/topology`           formations and their groups
//!
//! Status mapping: 2xx success, 4xx rejected, 5xx transport. The client owns
//! a current-thread runtime so callers stay synchronous.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use tokio::runtime::Runtime;

use super::client::{MonitorClient, RegisterRequest};
use super::errors::{MonitorError, MonitorResult};
use crate::observability::Logger;
use crate::state::NodeIdentity;
use crate::topology::TopologySnapshot;

/// Default bound on a single monitor call
pub const DEFAULT_MONITOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Monitor reached over HTTP
pub struct HttpMonitorClient {
    endpoint: String,
    base: Url,
    client: Client,
    runtime: Runtime,
    timeout: Duration,
}

impl HttpMonitorClient {
    /// Client for the monitor at `endpoint` (e.g. `http://monitor:8080`).
    pub fn new(endpoint: &str, timeout: Duration) -> MonitorResult<Self> {
        let endpoint = endpoint.trim_end_matches('/').to_string();

        let base = Url::parse(&endpoint).map_err(|e| MonitorError::Protocol {
            endpoint: endpoint.clone(),
            operation: "connect",
            reason: format!("invalid monitor uri: {}", e),
        })?;
        if base.cannot_be_a_base() {
            return Err(MonitorError::Protocol {
                endpoint,
                operation: "connect",
                reason: "monitor uri cannot carry a path".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Transport {
                endpoint: endpoint.clone(),
                operation: "connect",
                reason: format!("failed to build http client: {}", e),
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MonitorError::Transport {
                endpoint: endpoint.clone(),
                operation: "connect",
                reason: format!("failed to start runtime: {}", e),
            })?;

        Ok(Self {
            endpoint,
            base,
            client,
            runtime,
            timeout,
        })
    }

    fn url(&self, segments: &[&str]) -> MonitorResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| self.protocol_error("connect", "monitor uri cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Drive `request` to completion, bounded by the call timeout.
    fn call<T, F>(&self, operation: &'static str, request: F) -> MonitorResult<T>
    where
        F: Future<Output = MonitorResult<T>>,
    {
        Logger::trace(
            "MONITOR_CALL",
            &[("endpoint", &self.endpoint), ("operation", operation)],
        );

        self.runtime.block_on(async {
            match tokio::time::timeout(self.timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(self.timeout_error(operation)),
            }
        })
    }

    async fn check_status(&self, operation: &'static str, response: Response) -> MonitorResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let reason = if body.trim().is_empty() {
            status.to_string()
        } else {
            format!("{} {}", status, body.trim())
        };

        if status.is_client_error() {
            Err(MonitorError::Rejected {
                endpoint: self.endpoint.clone(),
                operation,
                reason,
            })
        } else {
            Err(MonitorError::Transport {
                endpoint: self.endpoint.clone(),
                operation,
                reason,
            })
        }
    }

    fn send_error(&self, operation: &'static str, e: reqwest::Error) -> MonitorError {
        if e.is_timeout() {
            self.timeout_error(operation)
        } else {
            MonitorError::Transport {
                endpoint: self.endpoint.clone(),
                operation,
                reason: e.to_string(),
            }
        }
    }

    fn timeout_error(&self, operation: &'static str) -> MonitorError {
        MonitorError::Timeout {
            endpoint: self.endpoint.clone(),
            operation,
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }

    fn protocol_error(&self, operation: &'static str, reason: String) -> MonitorError {
        MonitorError::Protocol {
            endpoint: self.endpoint.clone(),
            operation,
            reason,
        }
    }
}

impl MonitorClient for HttpMonitorClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn register(&self, request: &RegisterRequest) -> MonitorResult<NodeIdentity> {
        const OP: &str = "register";
        let url = self.url(&["v1", "nodes"])?;

        let identity = self.call(OP, async {
            let response = self
                .client
                .post(url)
                .json(request)
                .send()
                .await
                .map_err(|e| self.send_error(OP, e))?;
            let response = self.check_status(OP, response).await?;
            response
                .json::<NodeIdentity>()
                .await
                .map_err(|e| self.protocol_error(OP, e.to_string()))
        })?;

        if identity.node_name != request.node_name {
            return Err(self.protocol_error(
                OP,
                format!(
                    "registered \"{}\" but the answer names \"{}\"",
                    request.node_name, identity.node_name
                ),
            ));
        }
        Ok(identity)
    }

    fn fetch_identity(&self, node_name: &str) -> MonitorResult<Option<NodeIdentity>> {
        const OP: &str = "fetch_identity";
        let url = self.url(&["v1", "nodes", node_name])?;

        self.call(OP, async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| self.send_error(OP, e))?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let response = self.check_status(OP, response).await?;
            response
                .json::<NodeIdentity>()
                .await
                .map(Some)
                .map_err(|e| self.protocol_error(OP, e.to_string()))
        })
    }

    fn fetch_topology(&self) -> MonitorResult<TopologySnapshot> {
        const OP: &str = "fetch_topology";
        let url = self.url(&["v1", "topology"])?;

        let body = self.call(OP, async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| self.send_error(OP, e))?;
            let response = self.check_status(OP, response).await?;
            response
                .text()
                .await
                .map_err(|e| self.send_error(OP, e))
        })?;

        TopologySnapshot::decode(&body).map_err(|source| MonitorError::InvalidTopology {
            endpoint: self.endpoint.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyError;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Mock monitor on its own runtime; the client under test blocks on
    /// its private one, so tests stay synchronous.
    struct TestMonitor {
        server: MockServer,
        runtime: Runtime,
    }

    impl TestMonitor {
        fn start() -> Self {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let server = runtime.block_on(MockServer::start());
            Self { server, runtime }
        }

        fn mount(&self, mock: Mock) {
            self.runtime.block_on(mock.mount(&self.server));
        }

        fn uri(&self) -> String {
            self.server.uri()
        }

        fn client(&self) -> HttpMonitorClient {
            HttpMonitorClient::new(&self.uri(), Duration::from_secs(5)).unwrap()
        }
    }

    #[test]
    fn test_register_decodes_identity() {
        let monitor = TestMonitor::start();
        monitor.mount(
            Mock::given(method("POST"))
                .and(path("/v1/nodes"))
                .and(body_json(json!({
                    "node_name": "node-a",
                    "formation": "default",
                    "group": 0
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "node_id": 4,
                    "node_name": "node-a",
                    "formation": "default",
                    "group": 0
                })))
                .expect(1),
        );

        let identity = monitor
            .client()
            .register(&RegisterRequest::new("node-a", "default", 0))
            .unwrap();

        assert_eq!(identity.node_id, 4);
        assert_eq!(identity.formation, "default");
    }

    #[test]
    fn test_register_rejects_answer_for_other_node() {
        let monitor = TestMonitor::start();
        monitor.mount(
            Mock::given(method("POST"))
                .and(path("/v1/nodes"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "node_id": 4,
                    "node_name": "node-b",
                    "formation": "default",
                    "group": 0
                }))),
        );

        let err = monitor
            .client()
            .register(&RegisterRequest::new("node-a", "default", 0))
            .unwrap_err();

        assert!(matches!(err, MonitorError::Protocol { .. }));
    }

    #[test]
    fn test_fetch_identity_not_found_is_none() {
        let monitor = TestMonitor::start();
        monitor.mount(
            Mock::given(method("GET"))
                .and(path("/v1/nodes/node%20a"))
                .respond_with(ResponseTemplate::new(404))
                .expect(1),
        );

        assert_eq!(monitor.client().fetch_identity("node a").unwrap(), None);
    }

    #[test]
    fn test_fetch_identity_found() {
        let monitor = TestMonitor::start();
        monitor.mount(
            Mock::given(method("GET"))
                .and(path("/v1/nodes/node-a"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "node_id": 7,
                    "node_name": "node-a",
                    "formation": "sales",
                    "group": 1
                }))),
        );

        let identity = monitor.client().fetch_identity("node-a").unwrap().unwrap();

        assert_eq!(identity.node_id, 7);
        assert_eq!(identity.group, 1);
    }

    #[test]
    fn test_client_error_is_rejected() {
        let monitor = TestMonitor::start();
        monitor.mount(
            Mock::given(method("POST"))
                .and(path("/v1/nodes"))
                .respond_with(ResponseTemplate::new(409).set_body_string("group mismatch")),
        );

        let err = monitor
            .client()
            .register(&RegisterRequest::new("node-a", "default", 0))
            .unwrap_err();

        assert!(matches!(err, MonitorError::Rejected { .. }));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("group mismatch"));
    }

    #[test]
    fn test_server_error_is_retryable_transport() {
        let monitor = TestMonitor::start();
        monitor.mount(
            Mock::given(method("GET"))
                .and(path("/v1/topology"))
                .respond_with(ResponseTemplate::new(503)),
        );

        let err = monitor.client().fetch_topology().unwrap_err();

        assert!(matches!(err, MonitorError::Transport { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_fetch_topology_decodes_snapshot() {
        let monitor = TestMonitor::start();
        monitor.mount(
            Mock::given(method("GET"))
                .and(path("/v1/topology"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "formations": [{"name": "default", "groups": [0, 1]}]
                }))),
        );

        let topology = monitor.client().fetch_topology().unwrap();

        assert_eq!(topology.groups("default"), &[0, 1]);
    }

    #[test]
    fn test_oversized_topology_is_invalid() {
        let monitor = TestMonitor::start();
        monitor.mount(
            Mock::given(method("GET"))
                .and(path("/v1/topology"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "formations": [{"name": "f", "groups": [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]}]
                }))),
        );

        let err = monitor.client().fetch_topology().unwrap_err();

        assert!(matches!(
            err,
            MonitorError::InvalidTopology {
                source: TopologyError::TooManyGroups { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_slow_monitor_times_out() {
        let monitor = TestMonitor::start();
        monitor.mount(
            Mock::given(method("GET"))
                .and(path("/v1/topology"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"formations": []}))
                        .set_delay(Duration::from_secs(2)),
                ),
        );

        let client = HttpMonitorClient::new(&monitor.uri(), Duration::from_millis(200)).unwrap();
        let err = client.fetch_topology().unwrap_err();

        assert!(matches!(err, MonitorError::Timeout { timeout_ms: 200, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unreachable_monitor_is_transport() {
        // nothing listens on tcpmux
        let client = HttpMonitorClient::new("http://127.0.0.1:1", DEFAULT_MONITOR_TIMEOUT).unwrap();

        let err = client.fetch_identity("node-a").unwrap_err();

        assert!(matches!(err, MonitorError::Transport { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invalid_uri_is_rejected_up_front() {
        assert!(HttpMonitorClient::new("not a uri", DEFAULT_MONITOR_TIMEOUT).is_err());
    }
}
