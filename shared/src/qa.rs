//! Question answering over an indexed company.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::auth::AccessToken;
use crate::client::ApiClient;
use crate::error::QaError;
use crate::http::endpoints;
use crate::qa_config::QaConfig;

/// Answer text used when the backend returns no `output`.
pub const NO_ANSWER: &str = "No answer available";

/// `llm_kwargs` sub-object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmKwargs {
    pub model_name: String,
    pub temperature: f64,
}

/// `vectorstore_kwargs` sub-object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorstoreKwargs {
    pub k: u32,
    pub use_reranker: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_top_n: Option<u32>,
}

/// One question plus the settings to answer it with, as the backend expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaDict {
    pub query: String,
    pub llm_kwargs: LlmKwargs,
    pub vectorstore_kwargs: VectorstoreKwargs,
    pub recursion_limit: u32,
}

impl QaDict {
    pub fn new(query: impl Into<String>, config: &QaConfig) -> Self {
        Self {
            query: query.into(),
            llm_kwargs: LlmKwargs {
                model_name: config.model.id().to_string(),
                temperature: config.temperature,
            },
            vectorstore_kwargs: VectorstoreKwargs {
                k: config.retrieval_k,
                use_reranker: config.use_reranker,
                rerank_top_n: config.effective_rerank_top_n(),
            },
            recursion_limit: config.recursion_limit,
        }
    }
}

/// `/company_qa/` request body.
#[derive(Debug, Serialize)]
struct QaPayload<'a> {
    company_domain: &'a str,
    qa_dict: &'a QaDict,
}

/// A backend answer, kept with what was asked for display and audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub query: String,
    pub response: String,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    /// Full response body as returned by the backend
    pub raw_response: Value,
}

impl Answer {
    /// Structured record attached to the chat entry.
    pub fn detail(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl ApiClient {
    /// Ask one question about `domain` with the given settings.
    pub async fn ask_question(
        &self,
        domain: &str,
        query: &str,
        config: &QaConfig,
        token: &AccessToken,
        base_url: &str,
    ) -> Result<Answer, QaError> {
        config
            .check()
            .map_err(|e| QaError::InvalidConfig(e.to_string()))?;
        self.ask(domain, &QaDict::new(query, config), token, base_url)
            .await
    }

    /// Send a prepared [`QaDict`]. Used directly by batch runs.
    pub async fn ask(
        &self,
        domain: &str,
        qa_dict: &QaDict,
        token: &AccessToken,
        base_url: &str,
    ) -> Result<Answer, QaError> {
        let payload = QaPayload {
            company_domain: domain,
            qa_dict,
        };
        let body = serde_json::to_value(&payload)
            .map_err(|e| QaError::InvalidConfig(e.to_string()))?;

        let response = self
            .post(
                base_url,
                endpoints::COMPANY_QA,
                Some(token.as_str()),
                body,
                self.timeouts().qa,
            )
            .await
            .and_then(|r| r.ok())
            .map_err(|e| {
                warn!(domain, error = %e, "Question failed");
                QaError::from(e)
            })?;

        let raw_response: Value = response.json().map_err(QaError::from)?;
        let answer = match raw_response.get("output") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => NO_ANSWER.to_string(),
            Some(other) => other.to_string(),
        };

        info!(domain, model = %qa_dict.llm_kwargs.model_name, "Question answered");

        Ok(Answer {
            query: qa_dict.query.clone(),
            response: answer,
            domain: domain.to_string(),
            timestamp: Utc::now(),
            raw_response,
        })
    }
}
