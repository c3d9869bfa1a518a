//! In-memory indexes of tracked files and ref names, rebuilt from git listings
//! and kept current from watcher events.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::error::Error;
use crate::git::Git;
use crate::trie::PrefixTrie;

/// Namespace a short ref name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// `refs/heads/*`.
    LocalBranch,
    /// `refs/remotes/*`.
    RemoteBranch,
    /// `refs/tags/*`.
    Tag,
}

/// Every kind a short name is currently known as. A name can be a branch and a tag at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefKinds(
    /// Ordered so candidates come out in a stable order.
    BTreeSet<RefKind>,
);

/// Tracked files and ref names for one repository.
pub struct RepoIndex {
    /// Repository-relative path spelling to path.
    pub files: PrefixTrie<PathBuf>,
    /// Short ref name to the kinds it is known as.
    pub refs: PrefixTrie<RefKinds>,
}

impl RefKind {
    /// Human label, used to group choices for an ambiguous name.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::LocalBranch => "local branch",
            Self::RemoteBranch => "remote branch",
            Self::Tag => "tag",
        };
    }
}

impl RefKinds {
    /// Whether `kind` is present.
    pub fn contains(&self, kind: RefKind) -> bool {
        return self.0.contains(&kind);
    }

    /// Whether no kind is left.
    pub fn is_empty(&self) -> bool {
        return self.0.is_empty();
    }

    /// Kinds in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = RefKind> + '_ {
        return self.0.iter().copied();
    }

    /// This set plus `kind`.
    #[must_use]
    pub fn with(mut self, kind: RefKind) -> Self {
        self.0.insert(kind);
        return self;
    }

    /// This set minus `kind`.
    #[must_use]
    pub fn without(mut self, kind: RefKind) -> Self {
        self.0.remove(&kind);
        return self;
    }
}

impl RepoIndex {
    /// Index one full ref name. Returns whether the index changed: ignored
    /// namespaces, symbolic remote `HEAD`s, kinds switched off in config, and refs
    /// already known under this kind leave it as it was.
    pub fn add_ref(&mut self, full_name: &str, config: &Config) -> bool {
        let Some((name, kind)) = parse_ref_name(full_name) else {
            return false;
        };
        if !kind_enabled(kind, config) {
            return false;
        }
        if self.refs.get(&name).is_some_and(|kinds| return kinds.contains(kind)) {
            return false;
        }
        self.refs.update(&name, |old| return old.unwrap_or_default().with(kind));
        return true;
    }

    /// Build both indexes from raw listings.
    pub fn from_listings(files: &[String], refs: &[String], config: &Config) -> Self {
        let mut index = Self {
            files: PrefixTrie::new(),
            refs: PrefixTrie::new(),
        };
        for path in files.iter().filter(|p| return config.should_index(p)) {
            index.files.set(path, PathBuf::from(path));
        }
        index.reload_refs(refs, config);
        return index;
    }

    /// Query git for tracked files and refs and index them.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed` or `Error::GitUnavailable` from the listings.
    pub fn load(git: &Git, config: &Config) -> Result<Self, Error> {
        let files = git.list_files()?;
        let refs = git.list_refs()?;
        let index = Self::from_listings(&files, &refs, config);
        tracing::info!(files = index.files.len(), refs = index.refs.len(), "index built");
        return Ok(index);
    }

    /// Replace the ref index with a fresh one built from `refs`.
    pub fn reload_refs(&mut self, refs: &[String], config: &Config) {
        self.refs = PrefixTrie::new();
        for full_name in refs {
            self.add_ref(full_name, config);
        }
    }

    /// Forget one full ref name. The short name stays linkable while it is known
    /// under another kind. Returns whether anything changed.
    pub fn remove_ref(&mut self, full_name: &str) -> bool {
        let Some((name, kind)) = parse_ref_name(full_name) else {
            return false;
        };
        let Some(current) = self.refs.get(&name) else {
            return false;
        };
        if !current.contains(kind) {
            return false;
        }
        let remaining = self.refs.update(&name, |old| return old.unwrap_or_default().without(kind));
        if remaining.is_empty() {
            self.refs.delete(&name);
        }
        return true;
    }
}

/// Whether config lets this kind of ref be linked. Local branches always are.
const fn kind_enabled(kind: RefKind, config: &Config) -> bool {
    return match kind {
        RefKind::LocalBranch => true,
        RefKind::RemoteBranch => config.remote_branches,
        RefKind::Tag => config.tags,
    };
}

/// Split a full ref name into the short name shown in output and its kind.
///
/// `refs/remotes/<remote>/HEAD` is a symbolic pointer, not a branch, and other
/// namespaces (`refs/stash`, `refs/notes/*`) are not linked.
pub fn parse_ref_name(full_name: &str) -> Option<(String, RefKind)> {
    if let Some(name) = full_name.strip_prefix("refs/heads/") {
        return non_empty(name, RefKind::LocalBranch);
    }
    if let Some(name) = full_name.strip_prefix("refs/tags/") {
        return non_empty(name, RefKind::Tag);
    }
    let name = full_name.strip_prefix("refs/remotes/")?;
    let (remote, branch) = name.split_once('/')?;
    if remote.is_empty() || branch == "HEAD" {
        return None;
    }
    return non_empty(name, RefKind::RemoteBranch);
}

/// Pair a short name with its kind unless the name is empty.
fn non_empty(name: &str, kind: RefKind) -> Option<(String, RefKind)> {
    if name.is_empty() {
        return None;
    }
    return Some((name.to_string(), kind));
}
