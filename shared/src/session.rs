//! Per-user session state and the transitions that mutate it.
//!
//! A [`Session`] is an owned record threaded through every stateful
//! operation as `&mut Session`. Each method is one logical transition, and
//! authentication status is derived from the held token so the two cannot
//! disagree.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AccessToken, Credentials};
use crate::batch::{BatchOptions, BatchResults};
use crate::client::ApiClient;
use crate::config::Config;
use crate::crawl::{CrawlAck, CrawlJobRequest};
use crate::error::{AuthError, CrawlError, FetchError, QaError};
use crate::models::{ChatMessage, Company};
use crate::qa::{Answer, QaDict};
use crate::qa_config::QaConfig;

/// Which half of the front-end is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Submit crawl jobs
    Crawl,
    /// Chat with indexed company data
    #[default]
    Ask,
}

/// Outcome of a company-list refresh that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Not authenticated (or nothing to do); no request was sent
    Skipped,
    /// List replaced with this many companies
    Updated(usize),
}

/// Outcome of a successful login. The refresh that follows may still fail.
#[derive(Debug)]
pub struct Login {
    pub refresh: Result<Refresh, FetchError>,
}

/// State for one user session. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    access_token: Option<AccessToken>,
    pub credentials: Credentials,
    pub base_url: String,
    companies: Vec<Company>,
    chat_history: Vec<ChatMessage>,
    pub config: QaConfig,
    mode: AppMode,
    selected_domain: Option<String>,
}

impl Session {
    /// Fresh, unauthenticated session.
    pub fn new(credentials: Credentials, base_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            access_token: None,
            credentials,
            base_url: base_url.into(),
            companies: Vec::new(),
            chat_history: Vec::new(),
            config: QaConfig::default(),
            mode: AppMode::default(),
            selected_domain: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Credentials::new(&config.username, &config.password),
            &config.base_url,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True iff an access token is held.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    /// The held token has a past `exp` claim.
    pub fn token_expired(&self) -> bool {
        self.access_token
            .as_ref()
            .is_some_and(|t| t.is_expired_at(Utc::now()))
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    /// Drop the token, e.g. after a 401. Companies and chat are kept.
    pub fn invalidate(&mut self) {
        if self.access_token.take().is_some() {
            info!(session = %self.id, "Access token cleared");
        }
    }

    /// Log in and, on success, refresh the company list in the same step.
    ///
    /// Any failure leaves the session unauthenticated with no token.
    pub async fn authenticate_and_refresh(
        &mut self,
        client: &ApiClient,
    ) -> Result<Login, AuthError> {
        match client.authenticate(&self.credentials, &self.base_url).await {
            Ok(token) => {
                self.access_token = Some(token);
                info!(
                    session = %self.id,
                    username = %self.credentials.username,
                    "Session authenticated"
                );
                let refresh = self.refresh_companies(client).await;
                Ok(Login { refresh })
            }
            Err(e) => {
                self.access_token = None;
                Err(e)
            }
        }
    }

    /// Replace the company list with a fresh copy from the backend.
    ///
    /// No-op without a token. On failure the previous list is kept.
    pub async fn refresh_companies(&mut self, client: &ApiClient) -> Result<Refresh, FetchError> {
        let Some(token) = self.access_token.clone() else {
            return Ok(Refresh::Skipped);
        };

        match client.fetch_companies(&token, &self.base_url).await {
            Ok(companies) => {
                self.companies = companies;
                if let Some(domain) = &self.selected_domain {
                    if !self.companies.iter().any(|c| &c.domain == domain) {
                        self.selected_domain = None;
                    }
                }
                Ok(Refresh::Updated(self.companies.len()))
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.invalidate();
                }
                Err(e)
            }
        }
    }

    /// Switch between crawl and ask modes.
    ///
    /// Entering ask mode while authenticated refreshes the company list, as
    /// does staying in ask mode with an empty list.
    pub async fn switch_mode(
        &mut self,
        client: &ApiClient,
        mode: AppMode,
    ) -> Result<Refresh, FetchError> {
        let entering_ask = mode == AppMode::Ask && self.mode != AppMode::Ask;
        self.mode = mode;

        if mode == AppMode::Ask && (entering_ask || self.companies.is_empty()) {
            self.refresh_companies(client).await
        } else {
            Ok(Refresh::Skipped)
        }
    }

    /// Choose the company questions are asked about.
    pub fn select_domain(&mut self, domain: &str) -> Result<&Company, QaError> {
        let domain = domain.trim();
        let company = self
            .companies
            .iter()
            .find(|c| c.is_selectable() && c.domain == domain)
            .ok_or_else(|| QaError::UnknownDomain(domain.to_string()))?;
        self.selected_domain = Some(company.domain.clone());
        Ok(company)
    }

    /// The selected company, defaulting to the first selectable one.
    pub fn selected_company(&self) -> Option<&Company> {
        match &self.selected_domain {
            Some(domain) => self.companies.iter().find(|c| &c.domain == domain),
            None => self.companies.iter().find(|c| c.is_selectable()),
        }
    }

    /// Submit a crawl job on behalf of this session.
    pub async fn submit_crawl(
        &mut self,
        client: &ApiClient,
        request: &CrawlJobRequest,
    ) -> Result<CrawlAck, CrawlError> {
        let token = self
            .access_token
            .clone()
            .ok_or(CrawlError::NotAuthenticated)?;

        let result = client.submit_crawl(request, &token, &self.base_url).await;
        if matches!(&result, Err(e) if e.is_unauthorized()) {
            self.invalidate();
        }
        result
    }

    /// Ask a question about the selected company and record the exchange.
    ///
    /// Local precondition failures return before anything is recorded. Once
    /// the question is sent, the user message and the answer (or a warning
    /// entry describing the failure) are both appended to the chat history.
    pub async fn ask(&mut self, client: &ApiClient, query: &str) -> Result<Answer, QaError> {
        let token = self
            .access_token
            .clone()
            .ok_or(QaError::NotAuthenticated)?;
        let domain = self
            .selected_company()
            .map(|c| c.domain.clone())
            .ok_or(QaError::NoDomainSelected)?;
        self.config
            .check()
            .map_err(|e| QaError::InvalidConfig(e.to_string()))?;

        self.chat_history.push(ChatMessage::user(query));

        let result = client
            .ask_question(&domain, query, &self.config, &token, &self.base_url)
            .await;

        match &result {
            Ok(answer) => {
                self.chat_history.push(ChatMessage::assistant(
                    answer.response.clone(),
                    Some(answer.detail()),
                ));
            }
            Err(e) => {
                warn!(
                    session = %self.id,
                    domain = %domain,
                    error = %e,
                    "Recording failed question"
                );
                self.chat_history.push(ChatMessage::warning(e));
                if e.is_unauthorized() {
                    self.invalidate();
                }
            }
        }
        result
    }

    /// Ask many questions about many domains with this session's token.
    ///
    /// Any 401 in the results clears the token.
    pub async fn batch_ask(
        &mut self,
        client: &ApiClient,
        domains: &[String],
        questions: &[QaDict],
        options: BatchOptions,
    ) -> Result<BatchResults, QaError> {
        let token = self
            .access_token
            .clone()
            .ok_or(QaError::NotAuthenticated)?;
        let results = client
            .batch_ask(domains, questions, &token, &self.base_url, options)
            .await;

        let unauthorized = results
            .iter()
            .flatten()
            .any(|r| matches!(r, Err(e) if e.is_unauthorized()));
        if unauthorized {
            warn!(session = %self.id, "Batch rejected the access token");
            self.invalidate();
        }
        Ok(results)
    }

    /// Forget the whole conversation.
    pub fn clear_chat(&mut self) {
        self.chat_history.clear();
    }
}
