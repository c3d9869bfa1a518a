mod commands;
mod config;
mod diagnostics;
mod error;
mod git;
mod index;
mod linker;
mod logging;
mod matchers;
mod translator;
mod trie;
mod types;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};

use crate::commands::Query;

#[derive(Parser)]
#[command(name = "gitlinks", about = "Git-aware links for terminal output", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List tracked files known to the file matcher
    Files {
        /// Only paths starting with this prefix
        prefix: Option<String>,
    },
    /// Find commit, file, and ref links in text (a file, or stdin)
    Links {
        /// Text is output about this commit (e.g. from `git show`)
        #[arg(long)]
        commit: Option<String>,
        /// Exit 1 when no links are found
        #[arg(long)]
        fail_empty: bool,
        /// Input file; stdin when omitted
        input: Option<PathBuf>,
    },
    /// List branch and tag names known to the ref matcher
    Refs {
        /// Only names starting with this prefix
        prefix: Option<String>,
    },
    /// Follow a line of a file back through buffer, work tree, index, and HEAD
    Trace {
        /// Unsaved copy of the file; its lines are the ones being traced
        #[arg(long)]
        buffer: Option<PathBuf>,
        /// One-based line number
        #[arg(index = 2)]
        line: String,
        /// File in the work tree
        #[arg(index = 1)]
        path: PathBuf,
        /// Continue from HEAD back to this revision
        #[arg(long)]
        rev: Option<String>,
    },
    /// Map one line across a unified diff
    #[command(group(ArgGroup::new("query").required(true).args(["new", "old"])))]
    Translate {
        /// Diff file produced with --unified=0, or `-` for stdin
        #[arg(long, default_value = "-")]
        diff: String,
        /// Line in the new revision; prints its range in the old one
        #[arg(long)]
        new: Option<String>,
        /// Line in the old revision; prints its range in the new one
        #[arg(long)]
        old: Option<String>,
    },
    /// Keep the ref index current from filesystem events and report changes
    Watch,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let json = cli.format == Format::Json;

    let result = match cli.command {
        Commands::Files { prefix } => commands::files(prefix.as_deref(), json).map(|()| return ExitCode::SUCCESS),
        Commands::Links { commit, fail_empty, input } => {
            commands::links(input.as_deref(), commit.as_deref(), json, fail_empty)
        },
        Commands::Refs { prefix } => commands::refs(prefix.as_deref(), json).map(|()| return ExitCode::SUCCESS),
        Commands::Trace { buffer, line, path, rev } => commands::parse_line(&line)
            .and_then(|line| return commands::trace(&path, line, rev.as_deref(), buffer.as_deref(), json))
            .map(|()| return ExitCode::SUCCESS),
        Commands::Translate { diff, new, old } => translate_query(new.as_deref(), old.as_deref())
            .and_then(|query| return commands::translate(&diff, query, json))
            .map(|()| return ExitCode::SUCCESS),
        Commands::Watch => watch::run(json).map(|()| return ExitCode::SUCCESS),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3)
        },
    };
}

/// Turn the `--new`/`--old` pair into a query. Clap guarantees exactly one is set.
///
/// # Errors
///
/// Returns `Error::InvalidLine` if the given value is not a line number.
fn translate_query(new: Option<&str>, old: Option<&str>) -> Result<Query, error::Error> {
    return match (new, old) {
        (Some(line), _) => Ok(Query::New(commands::parse_line(line)?)),
        (None, Some(line)) => Ok(Query::Old(commands::parse_line(line)?)),
        (None, None) => Err(error::Error::InvalidLine {
            input: String::new(),
            reason: "needs --new or --old".to_string(),
        }),
    };
}
