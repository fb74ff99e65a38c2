//! Command dispatch: turns parsed commands into session transitions and
//! user-facing notices.

use agent_shared::{
    ApiClient, AppMode, BatchOptions, ChatMessage, CrawlError, CrawlJobRequest, CrawlMode,
    FetchError, LlmModel, QaDict, Refresh, Session,
};
use tracing::debug;

use crate::commands::{split_domains, Command};
use crate::render;

/// Something to show the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
    /// Preformatted multi-line output
    Block(String),
    Chat(ChatMessage),
}

const LOGIN_FIRST: &str = "Please authenticate first (/login).";
const SESSION_EXPIRED: &str = "Session expired. Please /login again.";
const NO_COMPANIES: &str =
    "No companies available. Please add companies using the Crawl Company Website feature first.";

pub struct App {
    session: Session,
    client: ApiClient,
    batch: BatchOptions,
}

impl App {
    pub fn new(session: Session, client: ApiClient, batch: BatchOptions) -> Self {
        Self {
            session,
            client,
            batch,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn prompt(&self) -> String {
        match self.session.mode() {
            AppMode::Crawl => "crawl> ".to_string(),
            AppMode::Ask => match self.session.selected_company() {
                Some(company) => format!("ask:{}> ", company.domain),
                None => "ask> ".to_string(),
            },
        }
    }

    /// Line shown while a slow command is in flight.
    pub fn progress(&self, command: &Command) -> Option<String> {
        match command {
            Command::Login => Some("Authenticating...".to_string()),
            Command::Text(_) if self.session.mode() == AppMode::Ask => Some(format!(
                "Thinking... (using {})",
                self.model().label()
            )),
            Command::Text(_) | Command::Crawl { .. } => {
                Some("Submitting crawl request...".to_string())
            }
            Command::Batch {
                domains, questions, ..
            } => Some(format!(
                "Asking {} question(s) across {} domain(s)...",
                questions.len(),
                domains.len()
            )),
            _ => None,
        }
    }

    pub async fn execute(&mut self, command: Command) -> Vec<Notice> {
        debug!(session = %self.session.id(), mode = ?self.session.mode(), "Executing command");

        match command {
            Command::Help => vec![Notice::Block(render::HELP.to_string())],
            Command::Quit => Vec::new(),
            Command::Status => vec![Notice::Block(render::status(&self.session))],
            Command::Login => self.login().await,
            Command::Logout => {
                self.session.invalidate();
                vec![Notice::Info("Logged out.".to_string())]
            }
            Command::SetUser(username) => {
                self.session.credentials.username = username;
                vec![Notice::Info("Username updated. Run /login to use it.".to_string())]
            }
            Command::SetPassword(password) => {
                self.session.credentials.password = password;
                vec![Notice::Info("Password updated. Run /login to use it.".to_string())]
            }
            Command::SetUrl(url) => {
                self.session.base_url = url;
                vec![Notice::Info(format!("Backend set to {}", self.session.base_url))]
            }
            Command::Mode(mode) => self.switch_mode(mode).await,
            Command::Companies => self.companies(),
            Command::Refresh => {
                let refresh = self.session.refresh_companies(&self.client).await;
                let mut notices = Vec::new();
                refresh_notices(refresh, &mut notices);
                if notices.is_empty() {
                    notices.push(Notice::Warning(LOGIN_FIRST.to_string()));
                }
                notices
            }
            Command::Select(domain) => match self.session.select_domain(&domain) {
                Ok(company) => vec![Notice::Success(format!(
                    "Chat with {} assistant",
                    company.display_name()
                ))],
                Err(e) => vec![Notice::Error(e.to_string())],
            },
            Command::Crawl { domains, prompt } => self.crawl(domains, prompt).await,
            Command::Set { key, value } => match self.session.config.apply(&key, &value) {
                Ok(()) => vec![Notice::Success(format!("{} updated", key))],
                Err(e) => vec![Notice::Error(e.to_string())],
            },
            Command::ShowConfig => vec![Notice::Block(render::config_summary(
                &self.session.config,
            ))],
            Command::Models => vec![Notice::Block(render::models_list(self.session.config.model))],
            Command::History => {
                if self.session.chat_history().is_empty() {
                    vec![Notice::Info("No messages yet.".to_string())]
                } else {
                    self.session
                        .chat_history()
                        .iter()
                        .cloned()
                        .map(Notice::Chat)
                        .collect()
                }
            }
            Command::Clear => {
                self.session.clear_chat();
                vec![Notice::Info("Chat history cleared.".to_string())]
            }
            Command::Batch { domains, questions } => self.batch(domains, questions).await,
            Command::Text(text) => match self.session.mode() {
                AppMode::Ask => self.ask(&text).await,
                AppMode::Crawl => self.crawl(split_domains(&text), None).await,
            },
        }
    }

    async fn login(&mut self) -> Vec<Notice> {
        match self.session.authenticate_and_refresh(&self.client).await {
            Ok(login) => {
                let mut notices = vec![Notice::Success("✅ Authenticated".to_string())];
                refresh_notices(login.refresh, &mut notices);
                notices
            }
            Err(e) => vec![
                Notice::Error(e.to_string()),
                Notice::Warning("⚠️ Not authenticated".to_string()),
            ],
        }
    }

    async fn switch_mode(&mut self, mode: AppMode) -> Vec<Notice> {
        let refresh = self.session.switch_mode(&self.client, mode).await;
        let mut notices = vec![Notice::Info(format!("Mode: {}", render::mode_label(mode)))];
        refresh_notices(refresh, &mut notices);

        if mode == AppMode::Ask {
            if !self.session.is_authenticated() {
                notices.push(Notice::Warning(
                    "Please authenticate first to use the chat feature.".to_string(),
                ));
            } else if let Some(company) = self.session.selected_company() {
                notices.push(Notice::Success(format!(
                    "Chat with {} assistant",
                    company.display_name()
                )));
            } else {
                notices.push(Notice::Warning(NO_COMPANIES.to_string()));
            }
        }
        notices
    }

    fn companies(&self) -> Vec<Notice> {
        if !self.session.is_authenticated() {
            return vec![Notice::Warning(LOGIN_FIRST.to_string())];
        }
        if self.session.companies().is_empty() {
            return vec![Notice::Warning(NO_COMPANIES.to_string())];
        }
        vec![Notice::Block(render::companies_table(self.session.companies()))]
    }

    async fn crawl(&mut self, domains: Vec<String>, prompt: Option<String>) -> Vec<Notice> {
        if self.session.mode() != AppMode::Crawl {
            return vec![Notice::Warning(
                "Crawling is available in crawl mode (/mode crawl).".to_string(),
            )];
        }
        if !self.session.is_authenticated() {
            return vec![Notice::Error(CrawlError::NotAuthenticated.to_string())];
        }

        let mode = match prompt {
            Some(prompt) => CrawlMode::Custom { prompt },
            None => CrawlMode::Lite,
        };
        let request = match CrawlJobRequest::new(domains, mode) {
            Ok(request) => request,
            Err(e) => return vec![Notice::Error(e.to_string())],
        };

        match self.session.submit_crawl(&self.client, &request).await {
            Ok(ack) => {
                let listing = ack
                    .domains
                    .iter()
                    .map(|d| format!("- {}", d))
                    .collect::<Vec<_>>()
                    .join("\n");
                vec![
                    Notice::Success("Crawling request submitted successfully!".to_string()),
                    Notice::Info(ack.message),
                    Notice::Block(format!("Domains being crawled:\n{}", listing)),
                ]
            }
            Err(e) => vec![Notice::Error(e.to_string())],
        }
    }

    async fn ask(&mut self, query: &str) -> Vec<Notice> {
        if !self.session.is_authenticated() {
            return vec![Notice::Warning(
                "Please authenticate first to use the chat feature.".to_string(),
            )];
        }

        let mut notices = Vec::new();
        if self.session.companies().is_empty() {
            let refresh = self.session.refresh_companies(&self.client).await;
            refresh_notices(refresh, &mut notices);
            if self.session.companies().is_empty() {
                notices.push(Notice::Warning(NO_COMPANIES.to_string()));
                return notices;
            }
        }

        match self.session.ask(&self.client, query).await {
            Ok(_) => {
                if let Some(message) = self.session.chat_history().last() {
                    notices.push(Notice::Chat(message.clone()));
                }
            }
            Err(e) if e.is_local() => notices.push(Notice::Error(e.to_string())),
            Err(e) => {
                if let Some(message) = self.session.chat_history().last() {
                    notices.push(Notice::Chat(message.clone()));
                }
                if e.is_unauthorized() {
                    notices.push(Notice::Warning(SESSION_EXPIRED.to_string()));
                }
            }
        }
        notices
    }

    async fn batch(&mut self, domains: Vec<String>, questions: Vec<String>) -> Vec<Notice> {
        let questions: Vec<QaDict> = questions
            .into_iter()
            .map(|q| QaDict::new(q, &self.session.config))
            .collect();

        match self
            .session
            .batch_ask(&self.client, &domains, &questions, self.batch)
            .await
        {
            Ok(results) => {
                let failed = results.iter().flatten().filter(|r| r.is_err()).count();
                let mut notices = vec![Notice::Block(render::batch_grid(
                    &domains, &questions, &results,
                ))];
                if failed > 0 {
                    notices.push(Notice::Warning(format!("{} request(s) failed", failed)));
                }
                if results
                    .iter()
                    .flatten()
                    .any(|r| matches!(r, Err(e) if e.is_unauthorized()))
                {
                    notices.push(Notice::Warning(SESSION_EXPIRED.to_string()));
                }
                notices
            }
            Err(e) => vec![Notice::Error(e.to_string())],
        }
    }

    /// Model currently used for questions.
    pub fn model(&self) -> LlmModel {
        self.session.config.model
    }
}

fn refresh_notices(refresh: Result<Refresh, FetchError>, notices: &mut Vec<Notice>) {
    match refresh {
        Ok(Refresh::Updated(count)) => {
            notices.push(Notice::Info(format!("{} companies available", count)))
        }
        Ok(Refresh::Skipped) => {}
        Err(e) => notices.push(Notice::Error(e.to_string())),
    }
}
