//! Client library for the Company Agent backend.
//!
//! This crate holds the session state, the HTTP clients for authentication,
//! the company directory, crawl submission and question answering, and the
//! batch QA orchestrator used by the console front-end.

pub mod auth;
pub mod batch;
pub mod client;
pub mod config;
pub mod crawl;
pub mod directory;
pub mod error;
pub mod http;
pub mod models;
pub mod qa;
pub mod qa_config;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use auth::{AccessToken, Credentials, TokenClaims};
pub use batch::{BatchOptions, BatchResults};
pub use client::ApiClient;
pub use config::{Config, Timeouts};
pub use crawl::{CrawlAck, CrawlJobRequest, CrawlMode};
pub use error::{ApiError, AuthError, ConfigError, CrawlError, FetchError, QaError};
pub use http::{HttpTransport, Transport};
pub use models::{ChatMessage, Company, Role};
pub use qa::{Answer, QaDict};
pub use qa_config::{LlmModel, QaConfig};
pub use session::{AppMode, Login, Refresh, Session};
