use std::path::Path;

use crate::error::Error;
use crate::matchers::MatcherKind;

/// Name of the per-repository config file, looked up at the work tree root.
pub const CONFIG_FILE: &str = ".gitlinks.toml";

/// Shortest abbreviated hash git itself accepts.
const HASH_LENGTH_FLOOR: usize = 4;

/// Length of a full SHA-1 object id.
const HASH_LENGTH_CEILING: usize = 40;

/// Project configuration loaded from `.gitlinks.toml`.
/// Exclude patterns are path prefixes applied to tracked files before indexing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tracked-path prefixes the file matcher never links.
    exclude: Vec<String>,
    /// Git executable to spawn.
    pub git: String,
    /// Matchers to run, in fan-out order.
    pub matchers: Vec<MatcherKind>,
    /// Longest hex run treated as a commit hash.
    pub max_hash_length: usize,
    /// Shortest hex run treated as a commit hash.
    pub min_hash_length: usize,
    /// Whether remote-tracking branches are indexed.
    pub remote_branches: bool,
    /// Whether tags are indexed.
    pub tags: bool,
}

/// Raw TOML structure for `.gitlinks.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct GitlinksTomlConfig {
    #[serde(default)]
    exclude: Vec<String>,
    git: Option<String>,
    matchers: Option<Vec<String>>,
    max_hash_length: Option<usize>,
    min_hash_length: Option<usize>,
    remote_branches: Option<bool>,
    tags: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            exclude: Vec::new(),
            git: "git".to_string(),
            matchers: vec![MatcherKind::Commit, MatcherKind::File, MatcherKind::Ref],
            max_hash_length: HASH_LENGTH_CEILING,
            min_hash_length: 7,
            remote_branches: true,
            tags: true,
        };
    }
}

impl Config {
    /// Load config from `.gitlinks.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed: a config the user
    /// wrote is never silently replaced by defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, `Error::UnknownMatcher` for an
    /// unrecognised matcher name, or `Error::ConfigInvalid` for out-of-range
    /// hash lengths.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        return Self::parse(&content, &path);
    }

    /// Parse config content. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus I/O.
    pub fn parse(content: &str, path: &Path) -> Result<Self, Error> {
        let raw: GitlinksTomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let matchers = match raw.matchers {
            None => defaults.matchers,
            Some(names) => names
                .iter()
                .map(|name| return MatcherKind::from_name(name))
                .collect::<Result<Vec<_>, Error>>()?,
        };

        let min_hash_length = raw.min_hash_length.unwrap_or(defaults.min_hash_length);
        let max_hash_length = raw.max_hash_length.unwrap_or(defaults.max_hash_length);
        if !(HASH_LENGTH_FLOOR..=HASH_LENGTH_CEILING).contains(&min_hash_length) {
            return Err(Error::ConfigInvalid {
                path: path.to_path_buf(),
                reason: format!(
                    "min_hash_length must be between {HASH_LENGTH_FLOOR} and {HASH_LENGTH_CEILING}, got {min_hash_length}"
                ),
            });
        }
        if !(min_hash_length..=HASH_LENGTH_CEILING).contains(&max_hash_length) {
            return Err(Error::ConfigInvalid {
                path: path.to_path_buf(),
                reason: format!(
                    "max_hash_length must be between min_hash_length ({min_hash_length}) and {HASH_LENGTH_CEILING}, got {max_hash_length}"
                ),
            });
        }

        return Ok(Self {
            exclude: raw.exclude,
            git: raw.git.unwrap_or(defaults.git),
            matchers,
            max_hash_length,
            min_hash_length,
            remote_branches: raw.remote_branches.unwrap_or(defaults.remote_branches),
            tags: raw.tags.unwrap_or(defaults.tags),
        });
    }

    /// Whether a tracked file should be offered as a link target.
    pub fn should_index(&self, relative_path: &str) -> bool {
        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.min_hash_length, 7);
        assert_eq!(config.matchers.len(), 3);
        assert!(config.should_index("src/main.rs"));
    }

    #[test]
    fn reads_all_keys() {
        let content = r#"
exclude = ["vendor/", "target"]
git = "/usr/bin/git"
matchers = ["ref", "commit"]
min_hash_length = 8
max_hash_length = 12
remote_branches = false
tags = false
"#;
        let config = Config::parse(content, Path::new(CONFIG_FILE)).unwrap();
        assert_eq!(config.git, "/usr/bin/git");
        assert_eq!(config.matchers, vec![MatcherKind::Ref, MatcherKind::Commit]);
        assert_eq!((config.min_hash_length, config.max_hash_length), (8, 12));
        assert!(!config.remote_branches);
        assert!(!config.tags);
        assert!(!config.should_index("vendor/lib.rs"));
        assert!(!config.should_index("target/debug/x"));
        assert!(config.should_index("src/vendor.rs"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "matchers = [").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }

    #[test]
    fn unknown_matcher_is_rejected() {
        let err = Config::parse("matchers = [\"issue\"]", Path::new(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, Error::UnknownMatcher { ref name } if name == "issue"));
    }

    #[test]
    fn hash_lengths_are_bounded() {
        let path = Path::new(CONFIG_FILE);
        assert!(matches!(Config::parse("min_hash_length = 2", path), Err(Error::ConfigInvalid { .. })));
        assert!(matches!(
            Config::parse("min_hash_length = 10\nmax_hash_length = 9", path),
            Err(Error::ConfigInvalid { .. })
        ));
        assert!(Config::parse("max_hash_length = 40", path).is_ok());
    }
}
