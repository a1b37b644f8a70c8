//! WireMock-based control endpoint
//!
//! Stands in for the relay so client behavior can be checked against
//! arbitrary statuses, bodies and delays.

use std::time::Duration;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Mock control endpoint
pub struct MockDimmerServer {
    pub server: MockServer,
}

impl MockDimmerServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Host value a client should use
    pub fn host(&self) -> String {
        format!("{}/iotdimmer", self.server.uri())
    }

    /// Answer every control request with `status` and `body`
    pub async fn respond(&self, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/iotdimmer"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Answer requests for one intensity with `status` after `delay`
    pub async fn respond_for_intensity(&self, intensity: i64, status: u16, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/iotdimmer"))
            .and(query_param("intensity", intensity.to_string()))
            .respond_with(ResponseTemplate::new(status).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Raw query strings of every request received so far
    pub async fn received_queries(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| r.url.query().unwrap_or_default().to_string())
            .collect()
    }
}
