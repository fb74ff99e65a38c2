//! Text rendering for the terminal. Everything here returns plain strings
//! except [`paint`], which applies colour.

use std::fmt::Write as _;

use agent_shared::models::NOT_AVAILABLE;
use agent_shared::{
    AppMode, BatchResults, ChatMessage, Company, LlmModel, QaConfig, QaDict, Role, Session,
};
use colored::Colorize;

use crate::app::Notice;

pub const HELP: &str = "\
Session
  /login                      authenticate and load the company list
  /logout                     forget the access token
  /user <name>                set the username
  /password <password>        set the password
  /url <base url>             set the backend base URL
  /status                     show session state

Crawl mode (/mode crawl)
  /crawl <domains...>         lite crawl of one or more domains
  /crawl <domains...> | <prompt>
                              custom crawl guided by a prompt
  <domains...>                same as /crawl

Ask mode (/mode ask)
  /companies                  list crawled companies
  /refresh                    reload the company list
  /select <domain>            choose the company to chat with
  <question>                  ask about the selected company
  /history                    show the conversation
  /clear                      clear the conversation
  /batch <d1,d2> | <q1> | <q2>
                              ask every question about every domain

Settings
  /config                     show QA settings
  /set <key> <value>          model, temperature, k, reranker, top-n, recursion
  /models                     list available models

  /help                       this text
  /quit                       exit";

pub fn mode_label(mode: AppMode) -> &'static str {
    match mode {
        AppMode::Crawl => "Crawl Company Website",
        AppMode::Ask => "Ask Question",
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

/// Two-column table of company names and domains.
pub fn companies_table(companies: &[Company]) -> String {
    let rows: Vec<(&str, &str)> = companies
        .iter()
        .map(|c| (or_na(&c.name), or_na(&c.domain)))
        .collect();

    let width = rows
        .iter()
        .map(|(name, _)| name.chars().count())
        .chain(std::iter::once("Company Name".len()))
        .max()
        .unwrap_or_default();

    let mut out = format!("{:<width$}  {}\n", "Company Name", "Domain");
    let _ = writeln!(out, "{}  {}", "-".repeat(width), "-".repeat(6));
    for (name, domain) in rows {
        let pad = width.saturating_sub(name.chars().count());
        let _ = writeln!(out, "{}{}  {}", name, " ".repeat(pad), domain);
    }
    out.trim_end().to_string()
}

pub fn config_summary(config: &QaConfig) -> String {
    let reranker = match config.effective_rerank_top_n() {
        Some(n) => format!("on (top {})", n),
        None => "off".to_string(),
    };
    format!(
        "model          {} ({})\n\
         temperature    {:.1}\n\
         k              {}\n\
         reranker       {}\n\
         recursion      {}",
        config.model.label(),
        config.model.id(),
        config.temperature,
        config.retrieval_k,
        reranker,
        config.recursion_limit,
    )
}

pub fn models_list(current: LlmModel) -> String {
    LlmModel::ALL
        .iter()
        .map(|model| {
            let marker = if *model == current { "*" } else { " " };
            format!("{} {:<28} {}", marker, model.label(), model.id())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn status(session: &Session) -> String {
    let auth = if !session.is_authenticated() {
        "not authenticated".to_string()
    } else if session.token_expired() {
        "authenticated (token expired)".to_string()
    } else {
        match session.access_token().and_then(|t| t.expires_at()) {
            Some(at) => format!("authenticated until {}", at.format("%Y-%m-%d %H:%M UTC")),
            None => "authenticated".to_string(),
        }
    };
    let selected = session
        .selected_company()
        .map(|c| c.display_name())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    format!(
        "session        {}\n\
         status         {}\n\
         user           {}\n\
         backend        {}\n\
         mode           {}\n\
         companies      {}\n\
         selected       {}",
        session.id(),
        auth,
        session.credentials.username,
        session.base_url,
        mode_label(session.mode()),
        session.companies().len(),
        selected,
    )
}

/// Answer grid, grouped by domain.
pub fn batch_grid(domains: &[String], questions: &[QaDict], results: &BatchResults) -> String {
    let mut out = String::new();
    for (domain, row) in domains.iter().zip(results) {
        let _ = writeln!(out, "{}", domain);
        for (qa_dict, result) in questions.iter().zip(row) {
            match result {
                Ok(answer) => {
                    let _ = writeln!(out, "  Q: {}\n  A: {}", qa_dict.query, answer.response);
                }
                Err(e) => {
                    let _ = writeln!(out, "  Q: {}\n  ⚠️ {}", qa_dict.query, e);
                }
            }
        }
    }
    out.trim_end().to_string()
}

/// Chat message body followed by its structured detail, if any.
pub fn chat_message(message: &ChatMessage) -> String {
    let speaker = match message.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    let mut out = format!("{}: {}", speaker, message.content);
    if let Some(detail) = &message.structured_detail {
        if let Ok(pretty) = serde_json::to_string_pretty(detail) {
            let _ = write!(out, "\n{}", pretty);
        }
    }
    out
}

/// Colour a notice for the terminal.
pub fn paint(notice: &Notice) -> String {
    match notice {
        Notice::Info(text) => text.bright_black().to_string(),
        Notice::Success(text) => text.bright_green().to_string(),
        Notice::Warning(text) => text.yellow().to_string(),
        Notice::Error(text) => text.red().to_string(),
        Notice::Block(text) => text.to_string(),
        Notice::Chat(message) if message.is_warning() => message.content.yellow().to_string(),
        Notice::Chat(message) => match message.role {
            Role::User => chat_message(message).green().to_string(),
            Role::Assistant => chat_message(message).bright_blue().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_companies_table_fills_missing_fields() {
        let table = companies_table(&[
            Company::new("Acme Corporation", "acme.com"),
            Company::new("", "globex.io"),
            Company::new("Initech", ""),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Company Name"));
        assert_eq!(lines[2], "Acme Corporation  acme.com");
        assert_eq!(lines[3], "N/A               globex.io");
        assert_eq!(lines[4], "Initech           N/A");
    }

    #[test]
    fn test_config_summary_reranker_off() {
        let mut config = QaConfig::default();
        config.use_reranker = false;
        let text = config_summary(&config);
        assert!(text.contains("reranker       off"));
        assert!(text.contains("temperature    0.1"));
    }

    #[test]
    fn test_models_list_marks_current() {
        let text = models_list(LlmModel::default());
        let marked: Vec<&str> = text.lines().filter(|l| l.starts_with('*')).collect();
        assert_eq!(marked.len(), 1);
        assert!(marked[0].ends_with(LlmModel::default().id()));
        assert_eq!(text.lines().count(), LlmModel::ALL.len());
    }

    #[test]
    fn test_chat_message_includes_detail() {
        let message = ChatMessage::assistant("Anvils.", Some(json!({"domain": "acme.com"})));
        let text = chat_message(&message);
        assert!(text.starts_with("Assistant: Anvils."));
        assert!(text.contains("\"domain\": \"acme.com\""));

        assert_eq!(chat_message(&ChatMessage::user("Hi")), "You: Hi");
    }
}
