//! Shared data models.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder shown for company fields the backend left out.
pub const NOT_AVAILABLE: &str = "N/A";

/// Marker prefixed to assistant messages that record a failure.
pub const WARNING_MARKER: &str = "⚠️";

/// A company known to the backend. Identity is the domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "company_name", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "company_domain", default, deserialize_with = "null_as_empty")]
    pub domain: String,
}

/// Missing and `null` fields both read as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Company {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
        }
    }

    /// Records without a domain are listed but cannot be asked about.
    pub fn is_selectable(&self) -> bool {
        !self.domain.is_empty()
    }

    /// Name for chat headers: the company name, else the capitalised first
    /// label of the domain (`acme.com` -> `Acme`).
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        let label = self.domain.split('.').next().unwrap_or_default();
        let mut chars = label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

/// `/company_list/` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct CompanyListResponse {
    #[serde(default)]
    pub companies: Vec<Company>,
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry of the chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Answer record kept for "view response details"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_detail: Option<Value>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            structured_detail: None,
        }
    }

    pub fn assistant(content: impl Into<String>, detail: Option<Value>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            structured_detail: detail,
        }
    }

    /// Assistant entry recording a failed request.
    pub fn warning(error: &impl std::fmt::Display) -> Self {
        Self::assistant(format!("{} {}", WARNING_MARKER, error), None)
    }

    pub fn is_warning(&self) -> bool {
        self.role == Role::Assistant && self.content.starts_with(WARNING_MARKER)
    }
}
