//! Typed producers of link candidates over one line of terminal text.
//!
//! Each matcher recognises one kind of thing (commit hashes, tracked files, ref
//! names) and reports candidates in character offsets. The resolver in
//! [`crate::linker`] decides which of them become links.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use regex::Regex;
use serde::Serialize;

use crate::config::CONFIG_FILE;
use crate::error::Error;
use crate::index::{RefKind, RefKinds};
use crate::trie::PrefixTrie;
use crate::types::LinkCandidate;

/// Turns an abbreviated hash into a full commit id.
pub trait CommitLookup {
    /// Full object id if `hash` names a commit, `None` if it names nothing.
    ///
    /// # Errors
    ///
    /// Returns an error only when the lookup itself could not run.
    fn resolve_commit(&self, hash: &str) -> Result<Option<String>, Error>;
}

/// Most lookups a `CommitMatcher` remembers before starting over.
const COMMIT_CACHE_LIMIT: usize = 4096;

/// Recognises abbreviated and full commit hashes that exist in the repository.
pub struct CommitMatcher<'a> {
    /// Lookups already answered, keyed by the hash as written. Lives for one run
    /// and is cleared once it holds `COMMIT_CACHE_LIMIT` entries.
    cache: RefCell<HashMap<String, Option<String>>>,
    /// Source of truth for which hashes are commits.
    lookup: &'a dyn CommitLookup,
    /// Hex run of the configured length range, on word boundaries.
    pattern: Regex,
}

/// State of the output a line belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineContext {
    /// Set when the text is output for one specific commit (e.g. `git show`).
    pub commit: Option<String>,
}

/// Candidate payload: what a span of text refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum LinkTarget {
    /// A commit, as written and fully resolved.
    Commit {
        /// Hash exactly as it appeared in the text.
        abbrev: String,
        /// Full object id.
        sha: String,
    },
    /// A tracked file, optionally at a specific commit.
    File {
        /// Path relative to the work tree root.
        path: PathBuf,
        /// Commit the surrounding output is about, if any.
        revision: Option<String>,
    },
    /// A branch or tag name.
    Ref {
        /// Which namespace the name lives in.
        kind: RefKind,
        /// Short name (`main`, `origin/main`, `v1.0`).
        name: String,
    },
}

/// Recognises tracked file paths.
pub struct FileMatcher<'a> {
    /// Tracked paths keyed by their repository-relative spelling.
    files: &'a PrefixTrie<PathBuf>,
}

/// Which matcher produced a candidate. Also the unit of configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    /// Commit hashes.
    Commit,
    /// Tracked files.
    File,
    /// Branches and tags.
    Ref,
}

/// Recognises branch and tag names.
pub struct RefMatcher<'a> {
    /// Short ref names with every kind each one is known as.
    refs: &'a PrefixTrie<RefKinds>,
}

/// A producer of link candidates for one kind of target.
pub trait Matcher {
    /// Candidates found in `line`, in character offsets.
    ///
    /// # Errors
    ///
    /// Returns an error when a repository lookup fails outright.
    fn find_matches(
        &self,
        line: &str,
        context: &LineContext,
    ) -> Result<Vec<LinkCandidate<LinkTarget>>, Error>;

    /// Which kind of candidate this matcher produces.
    fn kind(&self) -> MatcherKind;

    /// Whether the matcher has anything to contribute for lines in this context.
    fn should_provide(&self, context: &LineContext) -> bool;
}

impl<'a> CommitMatcher<'a> {
    /// Build a matcher for hex runs of `min_len..=max_len` characters.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigInvalid` if the lengths do not form a valid pattern.
    pub fn new(lookup: &'a dyn CommitLookup, min_len: usize, max_len: usize) -> Result<Self, Error> {
        let pattern = Regex::new(&format!(r"\b[0-9a-f]{{{min_len},{max_len}}}\b")).map_err(|e| {
            return Error::ConfigInvalid {
                path: PathBuf::from(CONFIG_FILE),
                reason: format!("hash length range {min_len}..={max_len}: {e}"),
            };
        })?;
        return Ok(Self {
            cache: RefCell::new(HashMap::new()),
            lookup,
            pattern,
        });
    }

    /// Resolve through the cache, asking the lookup only for unseen hashes.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures; failed lookups are not cached.
    fn resolve_cached(&self, hash: &str) -> Result<Option<String>, Error> {
        if let Some(known) = self.cache.borrow().get(hash) {
            return Ok(known.clone());
        }
        let resolved = self.lookup.resolve_commit(hash)?;
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= COMMIT_CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(hash.to_string(), resolved.clone());
        return Ok(resolved);
    }
}

impl Matcher for CommitMatcher<'_> {
    fn find_matches(
        &self,
        line: &str,
        context: &LineContext,
    ) -> Result<Vec<LinkCandidate<LinkTarget>>, Error> {
        let mut candidates = Vec::new();
        for found in self.pattern.find_iter(line) {
            let abbrev = found.as_str();
            let Some(sha) = self.resolve_cached(abbrev)? else {
                continue;
            };
            // Output about a commit links to other commits, not back to itself.
            if context.commit.as_deref() == Some(sha.as_str()) {
                continue;
            }
            let start_index = line.get(..found.start()).map_or(0, |before| return before.chars().count());
            candidates.push(LinkCandidate {
                length: abbrev.chars().count(),
                payload: LinkTarget::Commit {
                    abbrev: abbrev.to_string(),
                    sha,
                },
                start_index,
            });
        }
        return Ok(candidates);
    }

    fn kind(&self) -> MatcherKind {
        return MatcherKind::Commit;
    }

    fn should_provide(&self, _context: &LineContext) -> bool {
        return true;
    }
}

impl<'a> FileMatcher<'a> {
    /// Match against an index of tracked paths.
    pub const fn new(files: &'a PrefixTrie<PathBuf>) -> Self {
        return Self { files };
    }
}

impl Matcher for FileMatcher<'_> {
    fn find_matches(
        &self,
        line: &str,
        context: &LineContext,
    ) -> Result<Vec<LinkCandidate<LinkTarget>>, Error> {
        let chars: Vec<char> = line.chars().collect();
        let candidates = self
            .files
            .find_matches_where(line, |start, len| return stands_alone(&chars, start, len))
            .into_iter()
            .map(|m| {
                return LinkCandidate {
                    length: m.char_len(),
                    payload: LinkTarget::File {
                        path: m.value,
                        revision: context.commit.clone(),
                    },
                    start_index: m.start_index,
                };
            })
            .collect();
        return Ok(candidates);
    }

    fn kind(&self) -> MatcherKind {
        return MatcherKind::File;
    }

    fn should_provide(&self, _context: &LineContext) -> bool {
        return !self.files.is_empty();
    }
}

impl LinkTarget {
    /// Label of the disambiguation group this target is offered under.
    pub const fn label(&self) -> &'static str {
        return match self {
            Self::Commit { .. } => "commit",
            Self::File { .. } => "file",
            Self::Ref { kind, .. } => kind.label(),
        };
    }
}

impl MatcherKind {
    /// Parse a matcher name as written in `.gitlinks.toml`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownMatcher` for anything but `commit`, `file`, or `ref`.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        return match name {
            "commit" => Ok(Self::Commit),
            "file" => Ok(Self::File),
            "ref" => Ok(Self::Ref),
            _ => Err(Error::UnknownMatcher { name: name.to_string() }),
        };
    }
}

impl<'a> RefMatcher<'a> {
    /// Match against an index of short ref names.
    pub const fn new(refs: &'a PrefixTrie<RefKinds>) -> Self {
        return Self { refs };
    }
}

impl Matcher for RefMatcher<'_> {
    /// A name known under several kinds yields one candidate per kind over the
    /// same span, which the resolver merges into a single ambiguous link.
    fn find_matches(
        &self,
        line: &str,
        _context: &LineContext,
    ) -> Result<Vec<LinkCandidate<LinkTarget>>, Error> {
        let chars: Vec<char> = line.chars().collect();
        let mut candidates = Vec::new();
        for m in self.refs.find_matches_where(line, |start, len| return stands_alone(&chars, start, len)) {
            let length = m.char_len();
            for kind in m.value.iter() {
                candidates.push(LinkCandidate {
                    length,
                    payload: LinkTarget::Ref {
                        kind,
                        name: m.text.clone(),
                    },
                    start_index: m.start_index,
                });
            }
        }
        return Ok(candidates);
    }

    fn kind(&self) -> MatcherKind {
        return MatcherKind::Ref;
    }

    fn should_provide(&self, _context: &LineContext) -> bool {
        return !self.refs.is_empty();
    }
}

/// Run every providing matcher over one line and concatenate their candidates in
/// matcher order. The whole line fails if any matcher fails.
///
/// # Errors
///
/// Returns the first matcher error.
pub fn collect_candidates(
    matchers: &[&dyn Matcher],
    line: &str,
    context: &LineContext,
) -> Result<Vec<LinkCandidate<LinkTarget>>, Error> {
    let mut candidates = Vec::new();
    for matcher in matchers.iter().filter(|m| return m.should_provide(context)) {
        let found = matcher.find_matches(line, context)?;
        if !found.is_empty() {
            tracing::trace!(kind = ?matcher.kind(), count = found.len(), "candidates");
        }
        candidates.extend(found);
    }
    return Ok(candidates);
}

/// Characters that continue a name: a match touching one is part of a longer word.
fn is_name_char(c: char) -> bool {
    return c.is_alphanumeric() || c == '_' || c == '-';
}

/// Whether the `len` characters at `start` are not glued to surrounding name
/// characters. A slash may precede a match (`a/src/lib.rs` in diff headers) but
/// may not follow one.
fn stands_alone(chars: &[char], start: usize, len: usize) -> bool {
    let before = start.checked_sub(1).and_then(|i| return chars.get(i));
    let after = chars.get(start.saturating_add(len));
    let glued_before = before.is_some_and(|c| return is_name_char(*c));
    let glued_after = after.is_some_and(|c| return is_name_char(*c) || *c == '/');
    return !glued_before && !glued_after;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "test assertions")]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::linker::resolve_links;

    /// In-memory commit store that counts how often it is asked.
    struct FakeCommits {
        calls: Cell<usize>,
        commits: Vec<&'static str>,
    }

    impl CommitLookup for FakeCommits {
        fn resolve_commit(&self, hash: &str) -> Result<Option<String>, Error> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.commits.iter().find(|c| c.starts_with(hash)).map(|c| (*c).to_string()))
        }
    }

    const SHA_A: &str = "3f2a9c1d8e7b6a5f4e3d2c1b0a9f8e7d6c5b4a39";
    const SHA_B: &str = "aa11bb22cc33dd44ee55ff6600112233445566ff";

    fn fake() -> FakeCommits {
        FakeCommits { calls: Cell::new(0), commits: vec![SHA_A, SHA_B] }
    }

    fn files(paths: &[&str]) -> PrefixTrie<PathBuf> {
        let mut trie = PrefixTrie::new();
        for p in paths {
            trie.set(p, PathBuf::from(p));
        }
        trie
    }

    fn refs(entries: &[(&str, RefKind)]) -> PrefixTrie<RefKinds> {
        let mut trie: PrefixTrie<RefKinds> = PrefixTrie::new();
        for (name, kind) in entries {
            trie.update(name, |old| old.unwrap_or_default().with(*kind));
        }
        trie
    }

    #[test]
    fn commit_hashes_are_verified() {
        let lookup = fake();
        let matcher = CommitMatcher::new(&lookup, 7, 40).unwrap();
        let line = "3f2a9c1 Merge deadbee into aa11bb22cc";
        let found = matcher.find_matches(line, &LineContext::default()).unwrap();
        let spans: Vec<(usize, usize)> = found.iter().map(|c| (c.start_index, c.length)).collect();
        assert_eq!(spans, vec![(0, 7), (27, 10)]);
        assert_eq!(
            found[0].payload,
            LinkTarget::Commit { abbrev: "3f2a9c1".to_string(), sha: SHA_A.to_string() }
        );
    }

    #[test]
    fn commit_offsets_count_characters() {
        let lookup = fake();
        let matcher = CommitMatcher::new(&lookup, 7, 40).unwrap();
        let found = matcher.find_matches("→→ 3f2a9c1", &LineContext::default()).unwrap();
        assert_eq!(found[0].start_index, 3);
    }

    #[test]
    fn commit_lookups_are_cached() {
        let lookup = fake();
        let matcher = CommitMatcher::new(&lookup, 7, 40).unwrap();
        let context = LineContext::default();
        matcher.find_matches("3f2a9c1 3f2a9c1", &context).unwrap();
        matcher.find_matches("3f2a9c1", &context).unwrap();
        assert_eq!(lookup.calls.get(), 1);
    }

    #[test]
    fn commit_cache_stays_bounded() {
        let lookup = fake();
        let matcher = CommitMatcher::new(&lookup, 7, 40).unwrap();
        let context = LineContext::default();
        for i in 0..=COMMIT_CACHE_LIMIT {
            matcher.find_matches(&format!("{i:08x}"), &context).unwrap();
        }
        assert!(matcher.cache.borrow().len() <= COMMIT_CACHE_LIMIT);
        assert_eq!(lookup.calls.get(), COMMIT_CACHE_LIMIT + 1);

        let found = matcher.find_matches("3f2a9c1", &context).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn commit_context_suppresses_self_link() {
        let lookup = fake();
        let matcher = CommitMatcher::new(&lookup, 7, 40).unwrap();
        let context = LineContext { commit: Some(SHA_A.to_string()) };
        let found = matcher.find_matches("commit 3f2a9c1 parent aa11bb2", &context).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload.label(), "commit");
        assert_eq!(found[0].start_index, 22);
    }

    #[test]
    fn short_or_embedded_hex_is_ignored() {
        let lookup = fake();
        let matcher = CommitMatcher::new(&lookup, 7, 40).unwrap();
        let found = matcher.find_matches("3f2a9c x3f2a9c1d", &LineContext::default()).unwrap();
        assert!(found.is_empty());
        assert_eq!(lookup.calls.get(), 0);
    }

    #[test]
    fn files_carry_context_revision() {
        let index = files(&["src/main.rs", "README.md"]);
        let matcher = FileMatcher::new(&index);
        let context = LineContext { commit: Some(SHA_B.to_string()) };
        let found = matcher.find_matches(" M src/main.rs | 4 ++--", &context).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].start_index, found[0].length), (3, 11));
        assert_eq!(
            found[0].payload,
            LinkTarget::File { path: PathBuf::from("src/main.rs"), revision: Some(SHA_B.to_string()) }
        );
    }

    #[test]
    fn files_must_stand_alone() {
        let index = files(&["lib.rs", "src"]);
        let matcher = FileMatcher::new(&index);
        let context = LineContext::default();
        assert!(matcher.find_matches("mylib.rs", &context).unwrap().is_empty());
        assert!(matcher.find_matches("lib.rsx", &context).unwrap().is_empty());
        assert!(matcher.find_matches("src/other", &context).unwrap().is_empty());
        assert_eq!(matcher.find_matches("--- a/lib.rs", &context).unwrap().len(), 1);
        assert_eq!(matcher.find_matches("lib.rs:12:4", &context).unwrap().len(), 1);
    }

    #[test]
    fn glued_longer_ref_does_not_hide_standalone_one() {
        // `1.2.3x` is longer but starts right after `v`, so only `v1.2` may link.
        let index = refs(&[("v1.2", RefKind::Tag), ("1.2.3x", RefKind::LocalBranch)]);
        let matcher = RefMatcher::new(&index);
        let found = matcher.find_matches("see v1.2.3x", &LineContext::default()).unwrap();
        let spans: Vec<(usize, usize)> = found.iter().map(|c| (c.start_index, c.length)).collect();
        assert_eq!(spans, vec![(4, 4)]);
    }

    #[test]
    fn ambiguous_ref_yields_one_candidate_per_kind() {
        let index = refs(&[("v1", RefKind::LocalBranch), ("v1", RefKind::Tag), ("main", RefKind::LocalBranch)]);
        let matcher = RefMatcher::new(&index);
        let found = matcher.find_matches("v1 and main", &LineContext::default()).unwrap();
        let labels: Vec<(usize, &str)> = found.iter().map(|c| (c.start_index, c.payload.label())).collect();
        assert_eq!(labels, vec![(0, "local branch"), (0, "tag"), (7, "local branch")]);

        let links = resolve_links(&found);
        assert_eq!(links.len(), 2);
        assert!(links[0].is_ambiguous());
        assert!(!links[1].is_ambiguous());
    }

    #[test]
    fn fan_out_feeds_resolver() {
        let lookup = fake();
        let commits = CommitMatcher::new(&lookup, 7, 40).unwrap();
        let file_index = files(&["origin/main"]);
        let file_matcher = FileMatcher::new(&file_index);
        let ref_index = refs(&[("origin/main", RefKind::RemoteBranch), ("main", RefKind::LocalBranch)]);
        let ref_matcher = RefMatcher::new(&ref_index);
        let matchers: [&dyn Matcher; 3] = [&commits, &file_matcher, &ref_matcher];

        let candidates =
            collect_candidates(&matchers, "aa11bb2 origin/main", &LineContext::default()).unwrap();
        let links = resolve_links(&candidates);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].candidates[0].payload.label(), "commit");
        let labels: Vec<&str> = links[1].candidates.iter().map(|c| c.payload.label()).collect();
        assert_eq!(labels, vec!["file", "remote branch"]);
    }

    #[test]
    fn empty_indexes_do_not_provide() {
        let file_index = PrefixTrie::new();
        let ref_index = PrefixTrie::new();
        let context = LineContext::default();
        assert!(!FileMatcher::new(&file_index).should_provide(&context));
        assert!(!RefMatcher::new(&ref_index).should_provide(&context));
    }
}
