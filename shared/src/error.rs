//! Error types for the Company Agent client.

use thiserror::Error;

/// Failure of a single backend call, before it is attributed to a component.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Request never produced a response (connect failure, timeout, TLS)
    #[error("{0}")]
    Transport(String),

    /// Backend answered with something other than 200
    #[error("{status} - {body}")]
    Status { status: u16, body: String },

    /// Backend answered 200 with a body we could not read
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status code, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// A 401 means the bearer token is no longer accepted.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Errors from exchanging credentials for an access token.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Authentication failed: {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("Authentication failed: response carried no access token")]
    MissingToken,

    #[error("Authentication error: {0}")]
    Transport(String),
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body } => AuthError::Rejected { status, body },
            ApiError::Decode(_) => AuthError::MissingToken,
            ApiError::Transport(reason) => AuthError::Transport(reason),
        }
    }
}

/// Errors from the company directory. Never fatal: the previous list is kept.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Failed to fetch companies: {0}")]
    Api(#[from] ApiError),
}

impl FetchError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Api(err) if err.is_unauthorized())
    }
}

/// Errors from submitting a crawl job.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrawlError {
    #[error("Please enter at least one company domain")]
    NoDomains,

    #[error("Please enter a custom prompt")]
    MissingPrompt,

    #[error("Please authenticate first!")]
    NotAuthenticated,

    #[error("Failed to submit crawl request: {0}")]
    Api(#[from] ApiError),
}

impl CrawlError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CrawlError::Api(err) if err.is_unauthorized())
    }
}

/// Errors from asking a question about a company.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QaError {
    #[error("Please authenticate first to use the chat feature")]
    NotAuthenticated,

    #[error("No company domain selected")]
    NoDomainSelected,

    #[error("Unknown company domain: {0}")]
    UnknownDomain(String),

    #[error("Invalid QA configuration: {0}")]
    InvalidConfig(String),

    #[error("Error: {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("Error getting answer: {0}")]
    Transport(String),
}

impl From<ApiError> for QaError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body } => QaError::Rejected { status, body },
            ApiError::Transport(reason) => QaError::Transport(reason),
            ApiError::Decode(reason) => {
                QaError::Transport(format!("invalid response body: {}", reason))
            }
        }
    }
}

impl QaError {
    /// Failures caught before any request was sent.
    pub fn is_local(&self) -> bool {
        !matches!(self, QaError::Rejected { .. } | QaError::Transport(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, QaError::Rejected { status: 401, .. })
    }
}

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Unknown setting: {0}")]
    UnknownKey(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_carry_code_and_body() {
        let err = AuthError::from(ApiError::Status {
            status: 401,
            body: "bad credentials".to_string(),
        });
        assert_eq!(err.to_string(), "Authentication failed: 401 - bad credentials");
    }

    #[test]
    fn unauthorized_detection() {
        let api = ApiError::Status {
            status: 401,
            body: String::new(),
        };
        assert!(api.is_unauthorized());
        assert!(FetchError::from(api.clone()).is_unauthorized());
        assert!(CrawlError::from(api.clone()).is_unauthorized());
        assert!(QaError::from(api).is_unauthorized());
        assert!(!ApiError::Transport("refused".to_string()).is_unauthorized());
    }

    #[test]
    fn local_errors_are_flagged() {
        assert!(QaError::NoDomainSelected.is_local());
        assert!(!QaError::Transport("timed out".to_string()).is_local());
    }
}
