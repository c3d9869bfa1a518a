/// Crate-level error types for gitlinks diagnostics.
use std::path::PathBuf;

/// All errors in gitlinks carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the command, path, or reason for failure.
///
/// The trie, line translator, and link resolver never produce these: only the
/// git, config, and watcher layers around them do.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `.gitlinks.toml` parsed but holds a value outside its allowed range.
    #[error("invalid config {}: {reason}", path.display())]
    ConfigInvalid {
        /// Path to the offending config file.
        path: PathBuf,
        /// Which key was wrong and why.
        reason: String,
    },

    /// A git subprocess exited unsuccessfully.
    #[error("git {} failed: {stderr}", args.join(" "))]
    GitFailed {
        /// Arguments passed to git, without the executable.
        args: Vec<String>,
        /// Trimmed standard error of the failed invocation.
        stderr: String,
    },

    /// The git executable could not be spawned at all.
    #[error("cannot run `{program}`: {source}")]
    GitUnavailable {
        /// Executable that was attempted.
        program: String,
        /// The spawn error.
        source: std::io::Error,
    },

    /// A line number argument was zero or could not be parsed.
    #[error("invalid line `{input}`: {reason}")]
    InvalidLine {
        /// Raw user input.
        input: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of command output failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// The working directory is not inside a git work tree.
    #[error("not a git repository: {}", path.display())]
    NotARepository {
        /// Directory that was probed.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A matcher name in the config does not name a known matcher.
    #[error("unknown matcher: `{name}`")]
    UnknownMatcher {
        /// Matcher name as written in the config.
        name: String,
    },

    /// A revision given on the command line does not name a commit.
    #[error("unknown revision: `{rev}`")]
    UnknownRevision {
        /// Revision as given.
        rev: String,
    },

    /// The filesystem watcher could not be created or attached.
    #[error("watch {}: {reason}", path.display())]
    Watch {
        /// Path that was being watched.
        path: PathBuf,
        /// Description of the watcher failure.
        reason: String,
    },
}
