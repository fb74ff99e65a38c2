//! In-memory transport for tests: scripted replies, recorded requests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::http::{endpoints, ApiRequest, ApiResponse, Transport};

/// Scripted outcome of one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub result: Result<ApiResponse, ApiError>,
    /// Simulated latency before the reply is delivered
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::text(status, body.to_string())
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            result: Ok(ApiResponse::new(status, body)),
            delay: Duration::ZERO,
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self {
            result: Err(ApiError::Transport(reason.into())),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = dyn Fn(&ApiRequest) -> Reply + Send + Sync;

/// [`Transport`] that answers from a closure and records every request.
pub struct RecordingTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl RecordingTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Reply + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A well-behaved backend that knows one company, `Acme` at `acme.com`,
    /// and answers every question with a canned sentence.
    pub fn backend() -> Self {
        Self::new(Self::backend_reply)
    }

    /// Reply [`RecordingTransport::backend`] gives to `request`, for handlers
    /// that only override some endpoints.
    pub fn backend_reply(request: &ApiRequest) -> Reply {
        match request.path().as_str() {
            endpoints::AUTH_TOKEN => Reply::json(200, json!({"access": "test-token"})),
            endpoints::COMPANY_LIST => Reply::json(
                200,
                json!({"companies": [{"company_name": "Acme", "company_domain": "acme.com"}]}),
            ),
            endpoints::COMPANY_CRAWL => {
                Reply::json(200, json!({"message": "Crawl started"}))
            }
            endpoints::COMPANY_QA => {
                let query = request.body["qa_dict"]["query"].as_str().unwrap_or_default();
                let domain = request.body["company_domain"].as_str().unwrap_or_default();
                Reply::json(
                    200,
                    json!({"output": format!("{} answered for {}", query, domain), "steps": 2}),
                )
            }
            _ => Reply::text(404, "Not Found"),
        }
    }

    /// Requests received so far, in arrival order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    pub fn calls_to(&self, path: &str) -> Vec<ApiRequest> {
        self.lock()
            .iter()
            .filter(|r| r.path() == path)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ApiRequest>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_json(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let reply = (self.handler)(&request);
        self.lock().push(request);

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }
}
