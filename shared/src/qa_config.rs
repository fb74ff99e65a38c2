//! Typed configuration for question-answering requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ConfigError;

/// Language models the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LlmModel {
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "o3-mini")]
    O3Mini,
    #[serde(rename = "gemini-1.5-pro")]
    Gemini15Pro,
    #[serde(rename = "gemini-1.5-flash")]
    Gemini15Flash,
    #[serde(rename = "gemini-2.0-flash-exp")]
    Gemini2FlashExp,
    #[serde(rename = "claude-3-5-sonnet-latest")]
    Claude35Sonnet,
    #[serde(rename = "claude-3-5-haiku-latest")]
    Claude35Haiku,
    #[default]
    #[serde(rename = "gemini-2.0-flash")]
    Gemini2Flash,
    #[serde(rename = "claude-3-7-sonnet-latest")]
    Claude37Sonnet,
    #[serde(rename = "gemini-2.5-pro-preview-03-25")]
    Gemini25ProPreview,
    #[serde(rename = "gpt-4.1")]
    Gpt41,
    #[serde(rename = "gpt-4.1-mini")]
    Gpt41Mini,
    #[serde(rename = "gpt-4.1-nano")]
    Gpt41Nano,
}

impl LlmModel {
    /// Every model, in menu order.
    pub const ALL: [LlmModel; 14] = [
        LlmModel::Gpt4o,
        LlmModel::Gpt4oMini,
        LlmModel::O3Mini,
        LlmModel::Gemini15Pro,
        LlmModel::Gemini15Flash,
        LlmModel::Gemini2FlashExp,
        LlmModel::Claude35Sonnet,
        LlmModel::Claude35Haiku,
        LlmModel::Gemini2Flash,
        LlmModel::Claude37Sonnet,
        LlmModel::Gemini25ProPreview,
        LlmModel::Gpt41,
        LlmModel::Gpt41Mini,
        LlmModel::Gpt41Nano,
    ];

    /// Identifier sent to the backend as `model_name`.
    pub fn id(&self) -> &'static str {
        match self {
            LlmModel::Gpt4o => "gpt-4o",
            LlmModel::Gpt4oMini => "gpt-4o-mini",
            LlmModel::O3Mini => "o3-mini",
            LlmModel::Gemini15Pro => "gemini-1.5-pro",
            LlmModel::Gemini15Flash => "gemini-1.5-flash",
            LlmModel::Gemini2FlashExp => "gemini-2.0-flash-exp",
            LlmModel::Claude35Sonnet => "claude-3-5-sonnet-latest",
            LlmModel::Claude35Haiku => "claude-3-5-haiku-latest",
            LlmModel::Gemini2Flash => "gemini-2.0-flash",
            LlmModel::Claude37Sonnet => "claude-3-7-sonnet-latest",
            LlmModel::Gemini25ProPreview => "gemini-2.5-pro-preview-03-25",
            LlmModel::Gpt41 => "gpt-4.1",
            LlmModel::Gpt41Mini => "gpt-4.1-mini",
            LlmModel::Gpt41Nano => "gpt-4.1-nano",
        }
    }

    /// Human-readable menu label.
    pub fn label(&self) -> &'static str {
        match self {
            LlmModel::Gpt4o => "GPT-4o",
            LlmModel::Gpt4oMini => "GPT-4o mini",
            LlmModel::O3Mini => "GPT-o3 mini",
            LlmModel::Gemini15Pro => "Gemini 1.5 Pro",
            LlmModel::Gemini15Flash => "Gemini 1.5 Flash",
            LlmModel::Gemini2FlashExp => "Gemini 2 Flash Exp",
            LlmModel::Claude35Sonnet => "Claude 3.5 Sonnet",
            LlmModel::Claude35Haiku => "Claude 3.5 Haiku",
            LlmModel::Gemini2Flash => "Gemini 2 Flash",
            LlmModel::Claude37Sonnet => "Claude 3.7 Sonnet",
            LlmModel::Gemini25ProPreview => "Gemini 2.5 Pro Preview",
            LlmModel::Gpt41 => "GPT-4.1",
            LlmModel::Gpt41Mini => "GPT-4.1 Mini",
            LlmModel::Gpt41Nano => "GPT-4.1 Nano",
        }
    }
}

impl fmt::Display for LlmModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for LlmModel {
    type Err = ConfigError;

    /// Accepts either the backend identifier or the menu label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        LlmModel::ALL
            .into_iter()
            .find(|m| m.id().eq_ignore_ascii_case(wanted) || m.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::invalid("model", format!("unknown model {:?}", wanted)))
    }
}

/// Settings that travel with every QA request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QaConfig {
    pub model: LlmModel,
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: f64,
    /// Number of chunks retrieved
    #[validate(range(min = 1, max = 200))]
    pub retrieval_k: u32,
    pub use_reranker: bool,
    /// Kept while the reranker is off, but only sent when it is on
    #[validate(range(min = 1, max = 100))]
    pub rerank_top_n: u32,
    /// Cap on backend reasoning/tool-call steps
    #[validate(range(min = 25, max = 100))]
    pub recursion_limit: u32,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            model: LlmModel::default(),
            temperature: 0.1,
            retrieval_k: 30,
            use_reranker: true,
            rerank_top_n: 10,
            recursion_limit: 25,
        }
    }
}

impl QaConfig {
    /// `rerank_top_n` as sent on the wire: absent unless the reranker is on.
    pub fn effective_rerank_top_n(&self) -> Option<u32> {
        self.use_reranker.then_some(self.rerank_top_n)
    }

    /// Check every field against its allowed range.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::invalid("qa_config", e.to_string().replace('\n', "; ")))
    }

    /// Set one field from user input. The config is left unchanged on error.
    ///
    /// Keys: `model`, `temperature`, `k`, `reranker`, `top-n`, `recursion`.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut next = self.clone();
        let value = value.trim();

        match key {
            "model" => next.model = value.parse()?,
            "temperature" | "temp" => {
                let t: f64 = parse(key, value)?;
                if !t.is_finite() {
                    return Err(ConfigError::invalid(key, "must be a number between 0 and 1"));
                }
                // Slider step is 0.1
                next.temperature = (t * 10.0).round() / 10.0;
            }
            "k" | "retrieval_k" => next.retrieval_k = parse(key, value)?,
            "reranker" | "use_reranker" => next.use_reranker = parse_bool(key, value)?,
            "top-n" | "top_n" | "rerank_top_n" => next.rerank_top_n = parse(key, value)?,
            "recursion" | "recursion_limit" => next.recursion_limit = parse(key, value)?,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }

        next.validate()
            .map_err(|e| ConfigError::invalid(key, e.to_string().replace('\n', "; ")))?;
        *self = next;
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, format!("{:?}: {}", value, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::invalid(key, format!("expected on/off, got {:?}", value))),
    }
}
