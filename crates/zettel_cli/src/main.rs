//! CLI smoke driver for `zettel_core`.
//!
//! # Responsibility
//! - Exercise the note workflow and link graph end to end from a shell.
//! - Keep output line-oriented and deterministic for quick sanity checks.
//!
//! Storage locations and logging come from `ZETTEL_*` environment variables.

use clap::{Parser, Subcommand};
use log::error;
use std::process::ExitCode;
use zettel_core::db::open_db;
use zettel_core::{
    init_logging_from_config, CoreConfig, LinkGraphService, Note, NoteLink, NoteService,
    SqliteNoteStore,
};

type Notes<'conn> = NoteService<SqliteNoteStore<'conn>>;

#[derive(Parser)]
#[command(name = "zettel")]
#[command(version, about = "Wiki-linked notes with a persisted link graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Health check; prints `pong` without touching storage
    Ping,
    /// Print the core library version
    Version,
    /// Create a note and link it into the graph
    New {
        title: String,
        /// Initial note body
        body: Option<String>,
        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Replace a note body and re-scan its links
    Edit { slug: String, body: String },
    /// Re-scan links after the note file was edited outside zettel
    Rescan { slug: String },
    /// List notes, newest first
    List,
    /// Outgoing links of a note
    Links { slug: String },
    /// Notes linking to a note
    Backlinks { slug: String },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Version => "version",
            Self::New { .. } => "new",
            Self::Edit { .. } => "edit",
            Self::Rescan { .. } => "rescan",
            Self::List => "list",
            Self::Links { .. } => "links",
            Self::Backlinks { .. } => "backlinks",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::Ping => {
            println!("zettel_core ping={}", zettel_core::ping());
            return Ok(());
        }
        Commands::Version => {
            println!("zettel_core version={}", zettel_core::core_version());
            return Ok(());
        }
        _ => {}
    }

    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_logging_from_config(&config)?;

    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let store = SqliteNoteStore::try_new(&conn).map_err(|err| err.to_string())?;
    let notes = NoteService::new(LinkGraphService::new(store), config.notes_root.clone());

    let name = command.name();
    let result = dispatch(&notes, command);
    if let Err(message) = &result {
        error!("event=cli_command module=cli status=error command={name} error={message}");
    }
    result
}

fn dispatch(notes: &Notes<'_>, command: Commands) -> Result<(), String> {
    let graph = notes.graph();
    match command {
        Commands::Ping | Commands::Version => Ok(()),
        Commands::New { title, body, tags } => {
            let note = notes
                .create_note(&title, body.as_deref().unwrap_or(""), tags)
                .map_err(|err| err.to_string())?;
            println!("created {} ({})", note.slug, note.id);
            print_outgoing(notes, &note)
        }
        Commands::Edit { slug, body } => {
            let note = require_slug(notes, &slug)?;
            let note = notes
                .update_note_body(note.id, &body)
                .map_err(|err| err.to_string())?;
            print_outgoing(notes, &note)
        }
        Commands::Rescan { slug } => {
            let links = notes.rescan_note(&slug).map_err(|err| err.to_string())?;
            print_links(&links);
            Ok(())
        }
        Commands::List => {
            for note in graph.get_all_notes().map_err(|err| err.to_string())? {
                println!("{}\t{}\t{}", note.slug, note.title, note.tags.join(","));
            }
            Ok(())
        }
        Commands::Links { slug } => {
            let note = require_slug(notes, &slug)?;
            print_outgoing(notes, &note)
        }
        Commands::Backlinks { slug } => {
            let note = require_slug(notes, &slug)?;
            for link in graph.get_backlinks(note.id).map_err(|err| err.to_string())? {
                let source = graph
                    .get_note_by_id(link.source_note_id)
                    .map_err(|err| err.to_string())?;
                match source {
                    Some(source) => println!("{}\t{}", source.slug, source.title),
                    None => println!("{}\t(missing)", link.source_note_id),
                }
            }
            Ok(())
        }
    }
}

fn require_slug(notes: &Notes<'_>, slug: &str) -> Result<Note, String> {
    notes
        .graph()
        .get_note_by_slug(slug)
        .map_err(|err| err.to_string())?
        .ok_or_else(|| format!("no note with slug `{slug}`"))
}

fn print_outgoing(notes: &Notes<'_>, note: &Note) -> Result<(), String> {
    let links = notes
        .graph()
        .get_links_by_source_note(note.id)
        .map_err(|err| err.to_string())?;
    print_links(&links);
    Ok(())
}

fn print_links(links: &[NoteLink]) {
    for link in links {
        let state = if link.is_orphaned() {
            "orphaned"
        } else {
            "resolved"
        };
        println!("-> {}\t{}", link.target_slug, state);
    }
}
