//! Crawl job submission.
//!
//! A crawl runs asynchronously on the backend. A successful submission only
//! means the job was accepted.

use serde::Serialize;
use tracing::{info, warn};

use crate::auth::AccessToken;
use crate::client::ApiClient;
use crate::error::{ApiError, CrawlError};
use crate::http::endpoints;

/// Message shown when the backend accepts a job without saying anything.
pub const DEFAULT_ACK_MESSAGE: &str = "You will be notified when crawling is complete.";

/// How the backend should crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlMode {
    /// Fast, fixed extraction
    Lite,
    /// Extraction guided by a user prompt
    Custom { prompt: String },
}

/// A validated crawl request: at least one domain, trimmed and deduplicated,
/// and a non-empty prompt in custom mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJobRequest {
    domains: Vec<String>,
    mode: CrawlMode,
}

impl CrawlJobRequest {
    pub fn new<I, S>(domains: I, mode: CrawlMode) -> Result<Self, CrawlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for domain in domains {
            let domain = domain.as_ref().trim();
            if !domain.is_empty() && !unique.iter().any(|d| d == domain) {
                unique.push(domain.to_string());
            }
        }

        if unique.is_empty() {
            return Err(CrawlError::NoDomains);
        }
        if let CrawlMode::Custom { prompt } = &mode {
            if prompt.trim().is_empty() {
                return Err(CrawlError::MissingPrompt);
            }
        }

        Ok(Self {
            domains: unique,
            mode,
        })
    }

    pub fn lite<I, S>(domains: I) -> Result<Self, CrawlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(domains, CrawlMode::Lite)
    }

    pub fn custom<I, S>(domains: I, prompt: impl Into<String>) -> Result<Self, CrawlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            domains,
            CrawlMode::Custom {
                prompt: prompt.into(),
            },
        )
    }

    /// Parse a text area with one domain per line.
    pub fn from_lines(text: &str, mode: CrawlMode) -> Result<Self, CrawlError> {
        Self::new(text.lines(), mode)
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn mode(&self) -> &CrawlMode {
        &self.mode
    }

    fn payload(&self) -> CrawlPayload<'_> {
        let prompt = match &self.mode {
            CrawlMode::Lite => None,
            CrawlMode::Custom { prompt } => Some(prompt.as_str()),
        };
        CrawlPayload {
            company_domains: &self.domains,
            lite_crawl: prompt.is_none(),
            prompt,
        }
    }
}

/// `/company_crawl/` request body.
#[derive(Debug, Serialize)]
struct CrawlPayload<'a> {
    company_domains: &'a [String],
    lite_crawl: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
}

/// Backend acknowledgement of an accepted crawl job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlAck {
    pub message: String,
    /// Domains that were submitted
    pub domains: Vec<String>,
}

impl ApiClient {
    /// Submit a crawl job. Never retries.
    pub async fn submit_crawl(
        &self,
        request: &CrawlJobRequest,
        token: &AccessToken,
        base_url: &str,
    ) -> Result<CrawlAck, CrawlError> {
        let body = serde_json::to_value(request.payload())
            .map_err(|e| CrawlError::Api(ApiError::Decode(e.to_string())))?;

        let response = self
            .post(
                base_url,
                endpoints::COMPANY_CRAWL,
                Some(token.as_str()),
                body,
                self.timeouts().crawl,
            )
            .await
            .and_then(|r| r.ok())
            .map_err(|e| {
                warn!(domains = ?request.domains(), error = %e, "Crawl submission failed");
                CrawlError::Api(e)
            })?;

        // Any 200 is an acceptance, even with an unreadable body
        let message = response
            .json::<serde_json::Value>()
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ACK_MESSAGE.to_string());

        info!(
            domains = request.domains().len(),
            lite = matches!(request.mode(), CrawlMode::Lite),
            "Crawl job accepted"
        );

        Ok(CrawlAck {
            message,
            domains: request.domains().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingTransport, Reply};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn token() -> AccessToken {
        AccessToken::new("tok").unwrap()
    }

    #[test]
    fn test_domains_trimmed_and_deduplicated() {
        let request = CrawlJobRequest::from_lines(
            "  acme.com\n\nglobex.io \nacme.com\n   \n",
            CrawlMode::Lite,
        )
        .unwrap();
        assert_eq!(request.domains(), ["acme.com", "globex.io"]);
    }

    #[test]
    fn test_empty_domains_rejected() {
        assert_eq!(
            CrawlJobRequest::lite(Vec::<String>::new()),
            Err(CrawlError::NoDomains)
        );
        assert_eq!(
            CrawlJobRequest::from_lines(" \n\n  ", CrawlMode::Lite),
            Err(CrawlError::NoDomains)
        );
    }

    #[test]
    fn test_custom_requires_prompt() {
        assert_eq!(
            CrawlJobRequest::custom(["acme.com"], "   "),
            Err(CrawlError::MissingPrompt)
        );
        assert!(CrawlJobRequest::custom(["acme.com"], "Find pricing pages").is_ok());
    }

    #[tokio::test]
    async fn test_lite_payload_has_no_prompt_key() {
        let transport = Arc::new(RecordingTransport::backend());
        let client = ApiClient::new(transport.clone());
        let request = CrawlJobRequest::lite(["x.com", "y.com"]).unwrap();

        let ack = client.submit_crawl(&request, &token(), "https://api.test").await.unwrap();
        assert_eq!(ack.message, "Crawl started");
        assert_eq!(ack.domains, vec!["x.com", "y.com"]);

        let calls = transport.calls_to(endpoints::COMPANY_CRAWL);
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].body,
            json!({"company_domains": ["x.com", "y.com"], "lite_crawl": true})
        );
        assert!(calls[0].body.get("prompt").is_none());
        assert_eq!(calls[0].bearer.as_deref(), Some("tok"));
        assert_eq!(calls[0].timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_custom_payload_carries_prompt() {
        let transport = Arc::new(RecordingTransport::backend());
        let client = ApiClient::new(transport.clone());
        let request = CrawlJobRequest::custom(["acme.com"], "List leadership team").unwrap();

        client.submit_crawl(&request, &token(), "https://api.test").await.unwrap();

        assert_eq!(
            transport.calls()[0].body,
            json!({
                "company_domains": ["acme.com"],
                "lite_crawl": false,
                "prompt": "List leadership team"
            })
        );
    }

    #[tokio::test]
    async fn test_default_ack_message() {
        let client = ApiClient::new(Arc::new(RecordingTransport::new(|_| Reply::text(200, "{}"))));
        let request = CrawlJobRequest::lite(["acme.com"]).unwrap();
        let ack = client.submit_crawl(&request, &token(), "https://api.test").await.unwrap();
        assert_eq!(ack.message, DEFAULT_ACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let transport = Arc::new(RecordingTransport::new(|_| Reply::text(500, "queue full")));
        let client = ApiClient::new(transport.clone());
        let request = CrawlJobRequest::lite(["acme.com"]).unwrap();

        let err = client.submit_crawl(&request, &token(), "https://api.test").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to submit crawl request: 500 - queue full");
        assert_eq!(transport.call_count(), 1);
    }
}
