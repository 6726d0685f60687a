//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch a directory for JSON contact files and store them
#[derive(Parser, Debug)]
#[command(
    name = "contact-ingest",
    version = env!("CARGO_PKG_VERSION"),
    about = "Ingest contact files dropped into a watched directory",
    long_about = "Watches a directory for JSON files holding arrays of contact records, \
                  validates and normalizes each record, stores new contacts and removes \
                  the file once processed.",
    after_help = "Examples:\n  contact-ingest init\n  contact-ingest watch\n  contact-ingest watch --dir ./incoming\n  contact-ingest ingest batch.json\n  contact-ingest show 3\n  contact-ingest list --email example.com --limit 20",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .contact-ingest directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .contact-ingest/settings.toml")]
    Config,

    /// Watch the configured directory until interrupted
    #[command(about = "Watch a directory and ingest every new contact file")]
    Watch {
        /// Directory to watch (overrides config)
        #[arg(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Process files already in the directory before watching
        #[arg(long)]
        scan: bool,
    },

    /// Ingest specific files once
    #[command(about = "Ingest the given contact files and remove them")]
    Ingest {
        /// Contact files to process
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Show one stored contact
    #[command(about = "Show a stored contact by id")]
    Show {
        /// Contact id as printed by `list`
        #[arg(value_name = "ID")]
        id: u64,
    },

    /// List stored contacts
    #[command(about = "List stored contacts")]
    List {
        /// Only contacts whose name contains this text
        #[arg(long)]
        name: Option<String>,

        /// Only contacts whose email contains this text
        #[arg(long)]
        email: Option<String>,

        /// Maximum number of contacts to show
        #[arg(short, long, default_value_t = crate::store::DEFAULT_PAGE_SIZE)]
        limit: usize,

        /// Number of contacts to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch_with_overrides() {
        let cli = Cli::parse_from([
            "contact-ingest",
            "-c",
            "custom.toml",
            "watch",
            "--dir",
            "incoming",
            "--scan",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Commands::Watch { dir, scan } => {
                assert_eq!(dir, Some(PathBuf::from("incoming")));
                assert!(scan);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::parse_from(["contact-ingest", "list"]);
        match cli.command {
            Commands::List {
                name,
                email,
                limit,
                offset,
            } => {
                assert!(name.is_none());
                assert!(email.is_none());
                assert_eq!(limit, 10);
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_show_takes_numeric_id() {
        let cli = Cli::parse_from(["contact-ingest", "show", "3"]);
        assert!(matches!(cli.command, Commands::Show { id: 3 }));
        assert!(Cli::try_parse_from(["contact-ingest", "show", "abc"]).is_err());
    }

    #[test]
    fn test_ingest_requires_a_file() {
        assert!(Cli::try_parse_from(["contact-ingest", "ingest"]).is_err());
    }
}
