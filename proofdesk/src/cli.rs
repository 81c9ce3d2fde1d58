//! Command-line surface for the `proofdesk` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "proofdesk")]
#[command(author, version, about = "Terminal console for proofreading review")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a worklist item for proofreading review.
    Review {
        /// Worklist item id.
        worklist_id: i64,
        /// Where review data lives. Defaults to the config file setting.
        #[arg(long, value_enum)]
        backend: Option<BackendKind>,
        /// Pipeline API base URL (HTTP backend).
        #[arg(long)]
        api_url: Option<String>,
        /// SQLite database path (local backend).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Import an exported worklist item JSON file into the local store.
    Import {
        /// Worklist item JSON, as returned by the pipeline API.
        file: PathBuf,
        /// SQLite database path.
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Http,
    Local,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn review_accepts_backend_overrides() {
        let cli = Cli::parse_from(["proofdesk", "review", "42", "--backend", "local", "--db", "r.db"]);
        match cli.command {
            Command::Review { worklist_id, backend, db, api_url } => {
                assert_eq!(worklist_id, 42);
                assert_eq!(backend, Some(BackendKind::Local));
                assert_eq!(db, Some(PathBuf::from("r.db")));
                assert_eq!(api_url, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
