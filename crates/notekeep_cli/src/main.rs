//! Terminal front-end for the note core.
//!
//! # Responsibility
//! - Compose store -> repository -> commands explicitly at startup.
//! - Apply input filtering before anything reaches the core.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use notekeep_core::{
    flush_logging, format_entry_date, init_logging_from_config, sample_notes, CoreConfig, Note,
    NoteRepository, NoteStoreHandle,
};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "notekeep", version, about = "Keep short local notes")]
struct Cli {
    /// Database file; overrides NOTEKEEP_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check core linkage.
    Ping,
    /// Save a new note.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    /// Print all notes in insertion order.
    List,
    /// Delete one note by id.
    Remove { id: Uuid },
    /// Delete every note.
    Clear,
    /// Insert demo notes.
    Seed,
}

impl Command {
    /// Subcommand name for log events; never carries user text.
    fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Add { .. } => "add",
            Self::List => "list",
            Self::Remove { .. } => "remove",
            Self::Clear => "clear",
            Self::Seed => "seed",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Ping = cli.command {
        println!("notekeep_core ping={}", notekeep_core::ping());
        println!("notekeep_core version={}", notekeep_core::core_version());
        return Ok(());
    }

    let mut config = CoreConfig::from_env();
    if let Some(db) = cli.db {
        config = config.with_db_path(db);
    }
    init_logging_from_config(&config).context("failed to initialize logging")?;

    // Buffered events are lost unless flushed before the process exits.
    let result = open_and_run(&config, cli.command);
    if let Err(err) = &result {
        error!("event=cli_command module=cli status=error error={:#}", err);
    }
    flush_logging();
    result
}

fn open_and_run(config: &CoreConfig, command: Command) -> Result<()> {
    let store = NoteStoreHandle::open(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let repo = NoteRepository::new(store);
    info!(
        "event=cli_command module=cli status=start command={}",
        command.name()
    );

    run(&repo, command)
}

fn run(repo: &NoteRepository, command: Command) -> Result<()> {
    match command {
        Command::Ping => {}
        Command::Add { title, description } => {
            let title = filtered_input("title", &title)?;
            let description = filtered_input("description", &description)?;
            let note = Note::new(title, description)?;
            repo.add_note(note).wait()?;
            println!("Note added");
        }
        Command::List => {
            let snapshot = repo
                .get_all_notes()
                .blocking_next()
                .context("note store stopped before the list was read")?;
            if snapshot.is_empty() {
                println!("No notes yet");
            }
            for note in snapshot.notes() {
                print_note(note);
            }
        }
        Command::Remove { id } => match repo.get_note(id).wait()? {
            Some(note) => {
                repo.delete_note(note).wait()?;
                println!("Note removed");
            }
            None => println!("No note with id {id}"),
        },
        Command::Clear => {
            let removed = repo.delete_all_notes().wait()?;
            println!("Removed {removed} notes");
        }
        Command::Seed => {
            let notes = sample_notes();
            let count = notes.len();
            for note in notes {
                repo.add_note(note).wait()?;
            }
            println!("Added {count} sample notes");
        }
    }
    Ok(())
}

fn print_note(note: &Note) {
    let date = format_entry_date(note.entry_date()).unwrap_or_else(|| "-".to_string());
    println!("{}  {}", note.id(), note.title());
    println!("    {}", note.description());
    println!("    {date}");
}

/// Input accepted by the add form: letters and whitespace, not blank.
fn accepts_input(text: &str) -> bool {
    !text.trim().is_empty() && text.chars().all(|c| c.is_alphabetic() || c.is_whitespace())
}

fn filtered_input(field: &str, text: &str) -> Result<String> {
    if !accepts_input(text) {
        bail!("{field} must be non-empty and contain only letters and spaces");
    }
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::{accepts_input, Cli, Command};
    use clap::Parser;

    #[test]
    fn input_filter_allows_letters_and_spaces() {
        assert!(accepts_input("Call mom"));
        assert!(accepts_input("Café au lait"));
    }

    #[test]
    fn input_filter_rejects_digits_punctuation_and_blank() {
        assert!(!accepts_input("Milk, eggs"));
        assert!(!accepts_input("Room 42"));
        assert!(!accepts_input("   "));
        assert!(!accepts_input(""));
    }

    #[test]
    fn parses_add_command() {
        let cli = Cli::try_parse_from([
            "notekeep",
            "add",
            "--title",
            "Groceries",
            "--description",
            "Milk and eggs",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Add { ref title, ref description }
                if title == "Groceries" && description == "Milk and eggs"
        ));
    }

    #[test]
    fn global_db_flag_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["notekeep", "list", "--db", "/tmp/n.sqlite3"]).unwrap();
        assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("/tmp/n.sqlite3")));
    }

    #[test]
    fn logged_command_name_omits_note_text() {
        let cli = Cli::try_parse_from([
            "notekeep",
            "add",
            "--title",
            "Secret title",
            "--description",
            "Private body",
        ])
        .unwrap();

        let logged = cli.command.name();
        assert_eq!(logged, "add");
        assert!(!logged.contains("Secret"));
        assert!(!logged.contains("Private"));
    }
}
