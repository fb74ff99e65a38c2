//! Parsing of REPL input into commands.

use agent_shared::AppMode;
use thiserror::Error;

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Status,
    Login,
    Logout,
    SetUser(String),
    SetPassword(String),
    SetUrl(String),
    Mode(AppMode),
    Companies,
    Refresh,
    Select(String),
    /// Domains to crawl; a prompt (possibly empty) selects custom mode
    Crawl {
        domains: Vec<String>,
        prompt: Option<String>,
    },
    Set {
        key: String,
        value: String,
    },
    ShowConfig,
    Models,
    History,
    Clear,
    Batch {
        domains: Vec<String>,
        questions: Vec<String>,
    },
    /// Non-command text: a question in ask mode, domains in crawl mode
    Text(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown command: {0} (try /help)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

/// Slash commands offered for completion.
pub const COMMANDS: &[&str] = &[
    "/help",
    "/quit",
    "/status",
    "/login",
    "/logout",
    "/user",
    "/password",
    "/url",
    "/mode",
    "/companies",
    "/refresh",
    "/select",
    "/crawl",
    "/set",
    "/config",
    "/models",
    "/history",
    "/clear",
    "/batch",
];

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == "quit" || line == "exit" {
        return Ok(Some(Command::Quit));
    }
    if !line.starts_with('/') {
        return Ok(Some(Command::Text(line.to_string())));
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name {
        "/help" | "/?" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        "/status" => Command::Status,
        "/login" => Command::Login,
        "/logout" => Command::Logout,
        "/user" => Command::SetUser(required(rest, "/user <username>")?),
        "/password" => Command::SetPassword(required(rest, "/password <password>")?),
        "/url" => Command::SetUrl(required(rest, "/url <base url>")?),
        "/mode" => Command::Mode(parse_mode(rest)?),
        "/companies" => Command::Companies,
        "/refresh" => Command::Refresh,
        "/select" => Command::Select(required(rest, "/select <domain>")?),
        "/crawl" => parse_crawl(rest),
        "/set" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .ok_or(ParseError::Usage(SET_USAGE))?;
            Command::Set {
                key: key.to_ascii_lowercase(),
                value: value.trim().to_string(),
            }
        }
        "/config" => Command::ShowConfig,
        "/models" => Command::Models,
        "/history" => Command::History,
        "/clear" => Command::Clear,
        "/batch" => parse_batch(rest)?,
        other => return Err(ParseError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

const SET_USAGE: &str = "/set <model|temperature|k|reranker|top-n|recursion> <value>";
const BATCH_USAGE: &str = "/batch <domain,domain,...> | <question> | <question> ...";

fn required(rest: &str, usage: &'static str) -> Result<String, ParseError> {
    if rest.is_empty() {
        Err(ParseError::Usage(usage))
    } else {
        Ok(rest.to_string())
    }
}

fn parse_mode(rest: &str) -> Result<AppMode, ParseError> {
    match rest.to_ascii_lowercase().as_str() {
        "crawl" => Ok(AppMode::Crawl),
        "ask" | "chat" => Ok(AppMode::Ask),
        _ => Err(ParseError::Usage("/mode crawl|ask")),
    }
}

/// Split a domain list on whitespace and commas.
pub fn split_domains(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

/// `a.com b.com` is a lite crawl; `a.com | prompt` is a custom crawl.
/// Validation is left to the crawl request itself.
fn parse_crawl(rest: &str) -> Command {
    match rest.split_once('|') {
        Some((domains, prompt)) => Command::Crawl {
            domains: split_domains(domains),
            prompt: Some(prompt.trim().to_string()),
        },
        None => Command::Crawl {
            domains: split_domains(rest),
            prompt: None,
        },
    }
}

fn parse_batch(rest: &str) -> Result<Command, ParseError> {
    let mut parts = rest.split('|');
    let domains = split_domains(parts.next().unwrap_or_default());
    let questions: Vec<String> = parts
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect();

    if domains.is_empty() || questions.is_empty() {
        return Err(ParseError::Usage(BATCH_USAGE));
    }
    Ok(Command::Batch { domains, questions })
}
