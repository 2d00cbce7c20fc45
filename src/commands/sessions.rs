use crate::cli::SessionsCommand;
use crate::config::Config;
use crate::error::Result;
use crate::format::MarkupFormat;
use crate::session::{Role, Session, SessionStore};
use colored::Colorize;
use prettytable::{format, Table};
use std::io::{BufRead, Write};

/// Handle `tablechat sessions` commands
pub fn handle_sessions(config: &Config, command: SessionsCommand) -> Result<()> {
    let mut store = super::open_session_store(config, true)?;

    match command {
        SessionsCommand::List => {
            println!("\nSessions:");
            session_table(store.list(), store.active_id()).printstd();
            println!();
            println!(
                "Use {} to continue a session.",
                "tablechat chat --session <ID>".cyan()
            );
            println!();
        }
        SessionsCommand::Show { id, html } => {
            let Some(session) = store.resolve(&id).and_then(|id| store.get(&id)) else {
                println!("{}", format!("No session matches '{}'", id).yellow());
                return Ok(());
            };
            let format = if html {
                MarkupFormat::Html
            } else {
                config.chat.format
            };
            print!("{}", transcript(session, format));
        }
        SessionsCommand::Delete { id } => match store.resolve(&id) {
            Some(full_id) => {
                store.delete(&full_id);
                warn_if_unsaved(&store);
                println!("{}", format!("Deleted session {}", full_id).green());
            }
            None => println!("{}", format!("No session matches '{}'", id).yellow()),
        },
        SessionsCommand::Clear { yes } => {
            let count = store.list().len();
            if !yes && !confirm(&format!("Delete all {} sessions?", count))? {
                println!("Aborted.");
                return Ok(());
            }
            let fresh = store.clear_all();
            warn_if_unsaved(&store);
            println!(
                "{}",
                format!("Deleted {} sessions, started {}", count, fresh).green()
            );
        }
    }

    Ok(())
}

/// Table of sessions, most recent first, with the active one starred
pub fn session_table(sessions: &[Session], active: Option<&str>) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "",
        "ID".bold(),
        "Name".bold(),
        "Preview".bold(),
        "Messages".bold(),
        "Created".bold()
    ]);

    for session in sessions {
        let marker = if active == Some(session.id.as_str()) {
            "*"
        } else {
            ""
        };
        let created = session
            .created_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();

        table.add_row(prettytable::row![
            marker,
            session.short_id().cyan(),
            session.name,
            session.preview,
            session.messages.len(),
            created
        ]);
    }

    table
}

/// Printable transcript of a session
pub fn transcript(session: &Session, format: MarkupFormat) -> String {
    let mut out = format!(
        "{} {} ({})\n\n",
        "Session".bold(),
        session.id.cyan(),
        session.name
    );

    for message in &session.messages {
        let label = match message.role {
            Role::User => "You".cyan().bold(),
            Role::Assistant => "AI".green().bold(),
        };
        let time = message
            .timestamp
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M");
        out.push_str(&format!(
            "{} {}\n{}\n\n",
            label,
            time.to_string().dimmed(),
            format.render(&message.content)
        ));
    }

    out
}

fn warn_if_unsaved(store: &SessionStore) {
    if let Some(e) = store.last_persist_error() {
        eprintln!("{}", format!("Warning: change not saved: {}", e).red());
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
