//! Interactive console for the Company Agent backend.
//!
//! Configuration comes from the environment (optionally a `.env` file);
//! logs go to stderr, filtered by `RUST_LOG`.

mod app;
mod commands;
mod helper;
mod render;

use agent_shared::{ApiClient, Config, Session};
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::{App, Notice};
use crate::commands::Command;
use crate::helper::CliHelper;

fn init_tracing() {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);

    if std::env::var("AGENT_LOG_FORMAT").is_ok_and(|format| format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    let client = ApiClient::from_config(&config);
    let session = Session::from_config(&config);
    info!(session = %session.id(), base_url = %config.base_url, "Console starting");

    let mut app = App::new(session, client, config.batch);

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    println!("{}", "=== Company Agent ===".bright_magenta().bold());
    println!(
        "{}",
        "Type /login to authenticate, /help for commands, or /quit to exit.".bright_black()
    );
    println!(
        "{}",
        if app.session().is_authenticated() {
            "✅ Authenticated".green()
        } else {
            "⚠️ Not authenticated".yellow()
        }
    );
    println!();

    loop {
        match rl.readline(&app.prompt()) {
            Ok(line) => {
                let command = match commands::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{}", render::paint(&Notice::Error(e.to_string())));
                        continue;
                    }
                };

                // Keep passwords out of the history
                if !matches!(command, Command::SetPassword(_)) {
                    let _ = rl.add_history_entry(line.as_str());
                }

                if command == Command::Quit {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                if let Some(progress) = app.progress(&command) {
                    println!("{}", progress.bright_black());
                }
                for notice in app.execute(command).await {
                    println!("{}", render::paint(&notice));
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    info!(session = %app.session().id(), "Console exiting");
    Ok(())
}
