//! HTTP transport for the Company Agent backend.
//!
//! Every backend call is a JSON `POST`. [`Transport`] is the single seam the
//! clients send through, so tests can count and inspect requests without a
//! network.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Backend endpoint paths, relative to the base URL.
pub mod endpoints {
    pub const AUTH_TOKEN: &str = "/auth/token/";
    pub const COMPANY_LIST: &str = "/company_list/";
    pub const COMPANY_CRAWL: &str = "/company_crawl/";
    pub const COMPANY_QA: &str = "/company_qa/";
}

/// Join a base URL and an endpoint path without doubling the slash.
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// An outgoing JSON POST.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub url: String,
    /// Bearer token; absent only for the token endpoint
    pub bearer: Option<String>,
    pub body: Value,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Path component of the URL, for matching in tests and logs. Empty if
    /// the URL does not parse.
    pub fn path(&self) -> String {
        reqwest::Url::parse(&self.url)
            .map(|url| url.path().to_string())
            .unwrap_or_default()
    }
}

/// Status and raw body of a backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The backend contract treats only 200 as success.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Return `self` on 200, otherwise an [`ApiError::Status`] carrying code and body.
    pub fn ok(self) -> Result<Self, ApiError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(ApiError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Sends JSON requests to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, root certificates).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Transport(format!("request to {} timed out", request.url))
            } else {
                ApiError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to read response body: {}", e)))?;

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_cleanly() {
        assert_eq!(
            endpoint_url("https://api.example.com/", endpoints::AUTH_TOKEN),
            "https://api.example.com/auth/token/"
        );
        assert_eq!(
            endpoint_url("http://localhost:8000", endpoints::COMPANY_QA),
            "http://localhost:8000/company_qa/"
        );
    }

    #[test]
    fn test_request_path() {
        let request = ApiRequest {
            url: "https://api.example.com/v1/company_list/".to_string(),
            bearer: None,
            body: Value::Null,
            timeout: None,
        };
        assert_eq!(request.path(), "/v1/company_list/");

        let unparsable = ApiRequest {
            url: "not a url".to_string(),
            ..request
        };
        assert_eq!(unparsable.path(), "");
    }

    #[test]
    fn test_only_200_is_ok() {
        assert!(ApiResponse::new(200, "{}").ok().is_ok());

        let err = ApiResponse::new(201, "created").ok().unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 201,
                body: "created".to_string()
            }
        );
    }

    #[test]
    fn test_json_decode_error() {
        let err = ApiResponse::new(200, "<html>").json::<Value>().unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
