//! Command-line schema for the `notes` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use core_types::{SortBy, Theme, ViewMode};

#[derive(Parser, Debug)]
#[command(name = "notes")]
#[command(about = "A local note store with password-locked notes")]
#[command(version)]
pub struct Cli {
    /// Directory holding config.json (defaults to the user config dir)
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Note ids may be abbreviated to any unique prefix.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a note
    New {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// List notes, pinned first
    List {
        /// Case-insensitive match over title, content and tags
        #[arg(long, short)]
        query: Option<String>,
        /// Ordering (defaults to the saved preference)
        #[arg(long, short)]
        sort: Option<SortArg>,
        #[arg(long, short)]
        tag: Option<String>,
    },
    /// Print a note
    Show {
        id: String,
        /// Reveals a locked note for this invocation
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Rename a note
    Title {
        id: String,
        title: String,
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Replace a note's content; `-` reads stdin
    Write { id: String, content: String },
    Delete { id: String },
    /// Toggle the pinned flag
    Pin { id: String },
    Tag {
        id: String,
        #[arg(required = true)]
        tags: Vec<String>,
        #[arg(long, short)]
        password: Option<String>,
    },
    Untag {
        id: String,
        tag: String,
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Lock a note behind a password
    Lock {
        id: String,
        #[arg(long, short)]
        password: String,
        #[arg(long, short)]
        confirm: String,
    },
    /// Remove a note's lock, storing its plain content again
    Unlock {
        id: String,
        #[arg(long, short)]
        password: String,
    },
    /// Run the offline grammar rules over a note
    Grammar {
        id: String,
        /// Apply every rule to the note
        #[arg(long, conflicts_with = "apply")]
        fix: bool,
        /// Apply only the listed issue with this number
        #[arg(long, value_name = "N")]
        apply: Option<usize>,
        /// Print the content with issues marked up
        #[arg(long)]
        highlight: bool,
    },
    /// AI-assisted features through the configured completion command
    Assist {
        #[command(subcommand)]
        action: AssistAction,
    },
    /// Write all notes as JSON to a file or stdout
    Export { path: Option<PathBuf> },
    /// Merge notes from a JSON export
    Import { path: PathBuf },
    /// Show or change display preferences
    Prefs {
        #[arg(long)]
        theme: Option<ThemeArg>,
        #[arg(long)]
        view: Option<ViewArg>,
        #[arg(long)]
        sort: Option<SortArg>,
    },
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum AssistAction {
    /// One or two sentence summary
    Summarize {
        id: String,
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Suggest tags the note does not carry yet
    Tags {
        id: String,
        /// Add the suggestions to the note
        #[arg(long)]
        apply: bool,
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Key terms with short definitions
    Glossary {
        id: String,
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Grammar suggestions from the model
    Grammar {
        id: String,
        #[arg(long, short)]
        password: Option<String>,
    },
    Translate {
        id: String,
        #[arg(long, short)]
        language: String,
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Sentiment, key points and recommendations
    Insights {
        id: String,
        #[arg(long, short)]
        password: Option<String>,
    },
    /// List suggested translation languages
    Languages,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Updated,
    Created,
    Title,
}

impl From<SortArg> for SortBy {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Updated => SortBy::Updated,
            SortArg::Created => SortBy::Created,
            SortArg::Title => SortBy::Title,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewArg {
    Grid,
    List,
}

impl From<ViewArg> for ViewMode {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Grid => ViewMode::Grid,
            ViewArg::List => ViewMode::List,
        }
    }
}
