//! Backend API client shared by the auth, directory, crawl and QA calls.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::{Config, Timeouts};
use crate::error::ApiError;
use crate::http::{endpoint_url, ApiRequest, ApiResponse, HttpTransport, Transport};

/// Client for the Company Agent backend.
///
/// Holds no session state: the token and base URL are passed into every call.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    timeouts: Timeouts,
}

impl ApiClient {
    /// Create a client over any transport, with default timeouts.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            timeouts: Timeouts::default(),
        }
    }

    /// Create a `reqwest`-backed client from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(HttpTransport::new())).with_timeouts(config.timeouts)
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub(crate) async fn post(
        &self,
        base_url: &str,
        path: &str,
        bearer: Option<&str>,
        body: Value,
        timeout: Duration,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest {
            url: endpoint_url(base_url, path),
            bearer: bearer.map(str::to_string),
            body,
            timeout: Some(timeout),
        };

        debug!(url = %request.url, timeout_secs = timeout.as_secs(), "POST");
        let response = self.transport.post_json(request).await?;
        debug!(path, status = response.status, "response");

        Ok(response)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}
