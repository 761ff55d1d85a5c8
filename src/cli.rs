use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "sentinel-scan",
    version,
    about = "Security scanner for repositories, storage buckets, and code snippets",
    long_about = "sentinel-scan discovers scannable content, runs security tools against it, \
and aggregates the normalized findings into risk and compliance reports."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a remote repository (owner/name)
    Repo {
        /// Repository in owner/name form
        repo: String,

        /// Abort with partial results after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Cap on files collected during discovery
        #[arg(long)]
        max_units: Option<usize>,

        /// Directory recursion depth limit
        #[arg(long)]
        max_depth: Option<usize>,

        /// Let the secret detector verify credentials against their issuers
        #[arg(long)]
        verify_secrets: bool,
    },

    /// Scan a single code snippet from a file or stdin
    Snippet {
        /// Snippet file; '-' reads stdin
        #[arg(short = 'i', long, default_value = "-")]
        input: PathBuf,

        /// Snippet language (javascript, python, ...)
        #[arg(short, long)]
        language: String,

        /// Abort with partial results after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Audit a cloud storage bucket
    Bucket {
        /// Bucket name
        bucket: String,

        /// Abort with partial results after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Print a stored session report
    Show {
        /// Session id
        id: uuid::Uuid,
    },

    /// List recently stored sessions
    Recent {
        /// Maximum entries to list
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

impl Command {
    /// Parse "owner/name" into its parts.
    pub fn split_repo(repo: &str) -> Option<(&str, &str)> {
        let (owner, name) = repo.split_once('/')?;
        (!owner.is_empty() && !name.is_empty() && !name.contains('/')).then_some((owner, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_repo_command() {
        let cli = Cli::try_parse_from(["sentinel-scan", "repo", "acme/api", "--max-units", "5"])
            .unwrap();
        let Command::Repo {
            repo, max_units, ..
        } = cli.command
        else {
            panic!("expected repo command");
        };
        assert_eq!(repo, "acme/api");
        assert_eq!(max_units, Some(5));
    }

    #[test]
    fn test_parse_snippet_command() {
        let cli = Cli::try_parse_from([
            "sentinel-scan",
            "snippet",
            "--language",
            "python",
            "--format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Snippet { .. }));
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn test_split_repo() {
        assert_eq!(Command::split_repo("acme/api"), Some(("acme", "api")));
        assert_eq!(Command::split_repo("acme"), None);
        assert_eq!(Command::split_repo("a/b/c"), None);
        assert_eq!(Command::split_repo("/x"), None);
    }
}
