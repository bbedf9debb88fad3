//! Command-line interface for JobSeek.

mod commands;

use clap::{Args, Parser, Subcommand};

/// JobSeek - recurring job alerts by email
#[derive(Parser)]
#[command(name = "jobseek")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as background daemon with scheduler
    Daemon,

    /// Run a single alert cycle and print the report
    Check,

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage saved searches
    Search {
        #[command(subcommand)]
        command: SearchCommands,
    },

    /// Stop alerts for a user
    Unsubscribe {
        email: String,
        /// Only remove this saved search
        #[arg(long, conflicts_with = "all")]
        search: Option<i32>,
        /// Remove every saved search of the user
        #[arg(long)]
        all: bool,
    },

    /// Show postings already delivered for a saved search
    #[command(alias = "h")]
    History {
        search_id: i32,
        /// Number of entries to show
        limit: Option<u64>,
    },

    /// Create default config file
    Init,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user
    Add {
        email: String,
        name: String,
        #[arg(long, default_value = "basic")]
        plan: String,
    },
    /// List users
    #[command(alias = "ls")]
    List,
    /// Remove a user and everything they saved
    #[command(alias = "rm")]
    Remove { email: String },
}

#[derive(Subcommand)]
pub enum SearchCommands {
    /// Save a search for a user
    Add(SearchAddArgs),
    /// List saved searches
    #[command(alias = "ls")]
    List {
        /// Only show this user's searches
        email: Option<String>,
    },
    /// Remove a saved search
    #[command(alias = "rm")]
    Remove {
        id: i32,
        /// Owner of the search
        #[arg(long)]
        user: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SearchAddArgs {
    pub email: String,
    pub keyword: String,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub language: Option<String>,
    /// hourly or daily
    #[arg(long)]
    pub frequency: Option<String>,
    #[arg(long)]
    pub hours_old: Option<i32>,
    #[arg(long)]
    pub exclude: Option<String>,
    #[arg(long)]
    pub results_wanted: Option<i32>,
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_add() {
        let cli = Cli::try_parse_from([
            "jobseek",
            "search",
            "add",
            "ada@example.com",
            "rust developer",
            "--country",
            "Netherlands",
            "--frequency",
            "daily",
            "--hours-old",
            "48",
        ])
        .unwrap();

        let Some(Commands::Search {
            command: SearchCommands::Add(args),
        }) = cli.command
        else {
            panic!("expected search add");
        };
        assert_eq!(args.keyword, "rust developer");
        assert_eq!(args.country.as_deref(), Some("Netherlands"));
        assert_eq!(args.frequency.as_deref(), Some("daily"));
        assert_eq!(args.hours_old, Some(48));
    }

    #[test]
    fn test_unsubscribe_flags_conflict() {
        assert!(
            Cli::try_parse_from(["jobseek", "unsubscribe", "a@b.c", "--search", "3", "--all"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["jobseek", "unsubscribe", "a@b.c", "--all"]).is_ok());
    }

    #[test]
    fn test_history_limit_is_optional() {
        let cli = Cli::try_parse_from(["jobseek", "history", "7"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::History {
                search_id: 7,
                limit: None
            })
        ));
    }
}
