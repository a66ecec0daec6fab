//! CLI argument parsing using clap derive

use clap::{ArgAction, Parser, Subcommand};

/// Bulk - git-like workflow for a REST collection of JSON resources
#[derive(Parser, Debug)]
#[command(name = "bulk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Check out a remote collection into the current directory
    ///
    /// Fetches the index, then every resource it enumerates, and records
    /// the tracking metadata under .rshbulk/.
    ///
    /// Example:
    ///   bulk init api.example.com/all-items --url-template=/users/{user}/items/{id}
    Init {
        /// Index endpoint, e.g. example.com/all-items
        target: String,

        /// URL template mapping descriptor keys to resource URLs
        #[arg(long = "url-template")]
        url_template: String,
    },

    /// List tracked files, optionally filtered by content
    List {
        /// Filter expression applied to each file body, e.g. "id contains 1"
        #[arg(short = 'm', long = "match")]
        filter: Option<String>,

        /// Path selecting a fragment of each body for display, e.g. "id"
        #[arg(short = 'f', long = "fetch")]
        projection: Option<String>,
    },

    /// Show remote and local changes
    Status,

    /// Show pending changes as unified diffs
    Diff {
        /// Diff against the live remote instead of local edits
        #[arg(
            long,
            action = ArgAction::Set,
            num_args = 0..=1,
            default_value_t = false,
            default_missing_value = "true"
        )]
        remote: bool,
    },

    /// Fetch remote changes into the working tree
    Pull,

    /// Upload local changes to the remote
    Push,

    /// Restore a file from its reference copy
    Reset {
        /// Tracked path to restore, e.g. a/items/a1.json
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_init_command() {
        let cli = Cli::parse_from([
            "bulk",
            "init",
            "example.com/all-items",
            "--url-template=/users/{user}/items/{id}",
        ]);
        match cli.command {
            Commands::Init {
                target,
                url_template,
            } => {
                assert_eq!(target, "example.com/all-items");
                assert_eq!(url_template, "/users/{user}/items/{id}");
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn parse_list_defaults() {
        let cli = Cli::parse_from(["bulk", "list"]);
        assert_eq!(
            cli.command,
            Commands::List {
                filter: None,
                projection: None
            }
        );
    }

    #[test]
    fn parse_list_with_filter_and_projection() {
        let cli = Cli::parse_from(["bulk", "list", "-m", "id contains 1", "-f", "id"]);
        assert_eq!(
            cli.command,
            Commands::List {
                filter: Some("id contains 1".to_string()),
                projection: Some("id".to_string()),
            }
        );
    }

    #[test]
    fn parse_list_with_empty_filter() {
        let cli = Cli::parse_from(["bulk", "list", "-m", "", "-f", "id"]);
        assert_eq!(
            cli.command,
            Commands::List {
                filter: Some(String::new()),
                projection: Some("id".to_string()),
            }
        );
    }

    #[test]
    fn parse_status_command() {
        let cli = Cli::parse_from(["bulk", "status"]);
        assert_eq!(cli.command, Commands::Status);
    }

    #[test]
    fn parse_diff_defaults_to_local() {
        let cli = Cli::parse_from(["bulk", "diff"]);
        assert_eq!(cli.command, Commands::Diff { remote: false });
    }

    #[test]
    fn parse_diff_remote_flag_forms() {
        let cli = Cli::parse_from(["bulk", "diff", "--remote"]);
        assert_eq!(cli.command, Commands::Diff { remote: true });

        let cli = Cli::parse_from(["bulk", "diff", "--remote=false"]);
        assert_eq!(cli.command, Commands::Diff { remote: false });

        let cli = Cli::parse_from(["bulk", "diff", "--remote=true"]);
        assert_eq!(cli.command, Commands::Diff { remote: true });
    }

    #[test]
    fn parse_pull_and_push() {
        assert_eq!(Cli::parse_from(["bulk", "pull"]).command, Commands::Pull);
        assert_eq!(Cli::parse_from(["bulk", "push"]).command, Commands::Push);
    }

    #[test]
    fn parse_reset_command() {
        let cli = Cli::parse_from(["bulk", "reset", "a/items/a1.json"]);
        assert_eq!(
            cli.command,
            Commands::Reset {
                path: "a/items/a1.json".to_string()
            }
        );
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::parse_from(["bulk", "-v", "status"]);
        assert!(cli.verbose);

        let cli = Cli::parse_from(["bulk", "pull", "--verbose"]);
        assert!(cli.verbose);
    }
}
