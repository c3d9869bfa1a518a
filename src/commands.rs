//! Core CLI commands for gitlinks: links, translate, trace, refs, files.

use std::io::{BufRead, BufReader, Read as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;

use crate::config::Config;
use crate::error::Error;
use crate::git::Git;
use crate::index::RepoIndex;
use crate::linker::{group_choices, resolve_links};
use crate::matchers::{
    CommitLookup as _, CommitMatcher, FileMatcher, LineContext, LinkTarget, Matcher, MatcherKind,
    RefMatcher, collect_candidates,
};
use crate::translator::{LineTranslator, translate_range_to_oldest};
use crate::types::{LineRange, ResolvedLink};

/// One resolved link with the input line it was found on.
#[derive(Serialize)]
struct LinkRecord<'a> {
    /// One-based input line number.
    line: usize,
    /// The resolved link.
    #[serde(flatten)]
    link: &'a ResolvedLink<LinkTarget>,
}

/// Which side of a diff a `translate` query starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// A line in the newer revision.
    New(u32),
    /// A line in the older revision.
    Old(u32),
}

/// One revision a `trace` passes through, with the line range it lands on there.
#[derive(Serialize)]
struct TraceStep {
    /// Range in this revision.
    range: LineRange,
    /// Display name of the revision.
    revision: String,
}

/// Human-readable target of a link candidate.
fn describe_target(target: &LinkTarget) -> String {
    return match target {
        LinkTarget::Commit { sha, .. } => sha.clone(),
        LinkTarget::File { path, revision: None } => path.display().to_string(),
        LinkTarget::File { path, revision: Some(rev) } => format!("{}@{rev}", path.display()),
        LinkTarget::Ref { name, .. } => name.clone(),
    };
}

/// List indexed file paths under an optional prefix.
///
/// # Errors
///
/// Returns errors from repository discovery, config loading, or indexing.
pub fn files(prefix: Option<&str>, json: bool) -> Result<(), Error> {
    let (git, config) = open_repository()?;
    let index = RepoIndex::load(&git, &config)?;
    let entries = index.files.entries(prefix.unwrap_or(""));
    if json {
        let paths: Vec<&PathBuf> = entries.iter().map(|(_, path)| return *path).collect();
        println!("{}", serde_json::to_string(&paths)?);
        return Ok(());
    }
    for (key, _) in &entries {
        println!("{key}");
    }
    return Ok(());
}

/// Read text from a file, or stdin for `-`.
///
/// # Errors
///
/// Returns `Error::Io` if the input cannot be read.
fn read_input(source: &str) -> Result<String, Error> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    return Ok(std::fs::read_to_string(source)?);
}

/// Find links in every line of `input` (a file, or stdin when absent) and print them.
///
/// With `fail_empty`, finding no links at all exits 1.
///
/// # Errors
///
/// Returns errors from repository discovery, indexing, reading input, or commit lookups.
pub fn links(
    input: Option<&Path>,
    commit: Option<&str>,
    json: bool,
    fail_empty: bool,
) -> Result<ExitCode, Error> {
    let (git, config) = open_repository()?;
    let index = RepoIndex::load(&git, &config)?;

    let context = match commit {
        None => LineContext::default(),
        Some(rev) => {
            let sha = git.resolve_commit(rev)?.ok_or_else(|| return Error::UnknownRevision { rev: rev.to_string() })?;
            LineContext { commit: Some(sha) }
        },
    };

    let commit_matcher = CommitMatcher::new(&git, config.min_hash_length, config.max_hash_length)?;
    let file_matcher = FileMatcher::new(&index.files);
    let ref_matcher = RefMatcher::new(&index.refs);
    let matchers: Vec<&dyn Matcher> = config
        .matchers
        .iter()
        .map(|kind| {
            return match kind {
                MatcherKind::Commit => &commit_matcher as &dyn Matcher,
                MatcherKind::File => &file_matcher as &dyn Matcher,
                MatcherKind::Ref => &ref_matcher as &dyn Matcher,
            };
        })
        .collect();

    let mut reader: Box<dyn BufRead> = match input {
        None => Box::new(BufReader::new(std::io::stdin())),
        Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
    };

    let mut buf = Vec::new();
    let mut line_number = 0_usize;
    let mut total = 0_usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number = line_number.saturating_add(1);
        // Terminal output is not always UTF-8; a bad byte costs one character, not the run.
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        let candidates = collect_candidates(&matchers, line, &context)?;
        let resolved = resolve_links(&candidates);
        for link in &resolved {
            print_link(line_number, link, json)?;
        }
        total = total.saturating_add(resolved.len());
    }

    tracing::info!(links = total, "done");
    if fail_empty && total == 0 {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Discover the repository around the working directory and load its config,
/// switching to the configured git executable when it differs from `git`.
///
/// # Errors
///
/// Returns errors from discovery or config loading.
pub fn open_repository() -> Result<(Git, Config), Error> {
    let cwd = Path::new(".");
    let git = Git::discover("git", cwd)?;
    let config = Config::load(git.work_tree())?;
    if config.git == "git" {
        return Ok((git, config));
    }
    let git = Git::discover(&config.git, cwd)?;
    return Ok((git, config));
}

/// Parse a one-based line number.
///
/// # Errors
///
/// Returns `Error::InvalidLine` for zero, negative, or non-numeric input.
pub fn parse_line(input: &str) -> Result<u32, Error> {
    let line: u32 = input.trim().parse().map_err(|e: std::num::ParseIntError| {
        return Error::InvalidLine {
            input: input.to_string(),
            reason: e.to_string(),
        };
    })?;
    if line == 0 {
        return Err(Error::InvalidLine {
            input: input.to_string(),
            reason: "is not a line number".to_string(),
        });
    }
    return Ok(line);
}

/// Print one link. Ambiguous links list every choice, grouped by kind.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
fn print_link(line: usize, link: &ResolvedLink<LinkTarget>, json: bool) -> Result<(), Error> {
    if json {
        println!("{}", serde_json::to_string(&LinkRecord { line, link })?);
        return Ok(());
    }

    let column = link.start_index.saturating_add(1);
    let location = format!("{line}:{column}:{}", link.length);
    if !link.is_ambiguous()
        && let Some(only) = link.candidates.first()
    {
        println!("{location}\t{}\t{}", only.payload.label(), describe_target(&only.payload));
        return Ok(());
    }

    println!("{location}\tambiguous");
    for (label, targets) in &group_choices(link, LinkTarget::label) {
        let described: Vec<String> = targets.iter().map(|t| return describe_target(t)).collect();
        println!("  {label}\t{}", described.join(", "));
    }
    return Ok(());
}

/// List indexed ref names under an optional prefix, with their kinds.
///
/// # Errors
///
/// Returns errors from repository discovery, config loading, or indexing.
pub fn refs(prefix: Option<&str>, json: bool) -> Result<(), Error> {
    let (git, config) = open_repository()?;
    let index = RepoIndex::load(&git, &config)?;
    for (name, kinds) in index.refs.entries(prefix.unwrap_or("")) {
        let labels: Vec<&str> = kinds.iter().map(|k| return k.label()).collect();
        if json {
            let kinds: Vec<_> = kinds.iter().collect();
            println!("{}", serde_json::json!({ "kinds": kinds, "name": name }));
        } else {
            println!("{name}\t{}", labels.join(", "));
        }
    }
    return Ok(());
}

/// Follow a line of a file back through unsaved edits, the work tree, the index,
/// and optionally to an older revision, printing where it lands at each stage.
///
/// # Errors
///
/// Returns errors from repository discovery or any of the diffs.
pub fn trace(
    path: &Path,
    line: u32,
    rev: Option<&str>,
    buffer: Option<&Path>,
    json: bool,
) -> Result<(), Error> {
    let (git, _config) = open_repository()?;
    let on_disk = std::path::absolute(path)?;

    let mut stages: Vec<(String, LineTranslator)> = Vec::new();
    if let Some(buffer) = buffer {
        let diff = git.diff_no_index(&on_disk, &std::path::absolute(buffer)?)?;
        stages.push(("worktree".to_string(), LineTranslator::parse(&diff)));
    }
    let worktree = git.diff_unified0(&[], &on_disk)?;
    stages.push(("index".to_string(), LineTranslator::parse(&worktree)));
    let staged = git.diff_unified0(&["--cached"], &on_disk)?;
    stages.push(("HEAD".to_string(), LineTranslator::parse(&staged)));
    if let Some(rev) = rev {
        let committed = git.diff_unified0(&[rev, "HEAD"], &on_disk)?;
        stages.push((rev.to_string(), LineTranslator::parse(&committed)));
    }

    let start_name = if buffer.is_some() { "buffer" } else { "worktree" };
    let mut steps = vec![TraceStep {
        range: LineRange::single(line),
        revision: start_name.to_string(),
    }];
    let translators: Vec<LineTranslator> = stages.iter().map(|(_, t)| return t.clone()).collect();
    for (depth, (name, _)) in stages.iter().enumerate() {
        let chain = translators.get(..=depth).unwrap_or_default();
        steps.push(TraceStep {
            range: translate_range_to_oldest(LineRange::single(line), chain),
            revision: name.clone(),
        });
    }

    if json {
        println!("{}", serde_json::to_string(&steps)?);
        return Ok(());
    }
    for step in &steps {
        println!("{:<10} {}", step.revision, step.range);
    }
    return Ok(());
}

/// Answer one line query against a raw diff read from a file or stdin (`-`).
///
/// # Errors
///
/// Returns `Error::Io` if the diff cannot be read, or `Error::Json` on output failure.
pub fn translate(diff_source: &str, query: Query, json: bool) -> Result<(), Error> {
    let diff = read_input(diff_source)?;
    let translator = LineTranslator::parse(&diff);
    tracing::debug!(hunks = translator.hunks().len(), "parsed diff");

    let range = match query {
        Query::New(line) => translator.old_line(line),
        Query::Old(line) => translator.new_line(line),
    };

    if json {
        println!("{}", serde_json::to_string(&range)?);
    } else {
        println!("{range}");
    }
    return Ok(());
}
