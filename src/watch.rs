//! Ref watcher: keeps the ref index current while git creates and deletes refs.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};
use serde::Serialize;

use crate::commands;
use crate::config::Config;
use crate::error::Error;
use crate::index::RepoIndex;

/// Debounce delay between filesystem events and applying the batch.
const DEBOUNCE_MS: u64 = 100;

/// A change to the set of refs, derived from one filesystem event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "ref")]
pub enum RefEvent {
    /// A loose ref file appeared or was rewritten.
    Created(String),
    /// A loose ref file went away.
    Deleted(String),
    /// `packed-refs` changed; only a full reload is reliable.
    Repacked,
}

/// Apply a batch of events to the index, in order. A repack anywhere in the batch
/// triggers one full reload after the incremental events, since `git pack-refs`
/// deletes loose files for refs that still exist.
///
/// Returns the events that changed the index.
///
/// # Errors
///
/// Returns errors from `list_refs` when a reload is needed.
pub fn apply_ref_events<F>(
    index: &mut RepoIndex,
    events: &[RefEvent],
    config: &Config,
    list_refs: F,
) -> Result<Vec<RefEvent>, Error>
where
    F: FnOnce() -> Result<Vec<String>, Error>,
{
    let mut applied = Vec::new();
    let mut repacked = false;
    for event in events {
        let changed = match event {
            RefEvent::Created(name) => index.add_ref(name, config),
            RefEvent::Deleted(name) => index.remove_ref(name),
            RefEvent::Repacked => {
                repacked = true;
                false
            },
        };
        if changed {
            applied.push(event.clone());
        }
    }
    if repacked {
        let refs = list_refs()?;
        index.reload_refs(&refs, config);
        applied.push(RefEvent::Repacked);
    }
    return Ok(applied);
}

/// Create a filesystem watcher that forwards the paths of create, modify, and
/// remove events on the given channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<PathBuf>,
    git_dir: &Path,
) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            for path in event.paths {
                let _ = tx.send(path);
            }
        }
    })
    .map_err(|e| {
        return Error::Watch {
            path: git_dir.to_path_buf(),
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Turn one debounced batch of changed paths into ref events. A path reported
/// several times in the batch yields one event, at its first position.
fn events_for_paths<F>(git_dir: &Path, paths: &[PathBuf], exists: F) -> Vec<RefEvent>
where
    F: Fn(&Path) -> bool,
{
    let mut seen = HashSet::new();
    return paths
        .iter()
        .filter(|p| return seen.insert(*p))
        .filter_map(|p| return ref_event_for_path(git_dir, p, exists(p)))
        .collect();
}

/// Map a changed path inside the git directory to a ref event.
///
/// `exists` is whether a regular file is at `path` now; events are coalesced, so
/// the current state decides between created and deleted. Lock files and
/// anything outside `refs/` and `packed-refs` are ignored.
pub fn ref_event_for_path(git_dir: &Path, path: &Path, exists: bool) -> Option<RefEvent> {
    let relative = path.strip_prefix(git_dir).ok()?;
    if relative == Path::new("packed-refs") {
        return Some(RefEvent::Repacked);
    }
    if !relative.starts_with("refs") {
        return None;
    }
    let parts: Option<Vec<&str>> = relative
        .components()
        .map(|c| {
            return match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            };
        })
        .collect();
    let full_name = parts?.join("/");
    if full_name.ends_with(".lock") {
        return None;
    }
    if exists {
        return Some(RefEvent::Created(full_name));
    }
    return Some(RefEvent::Deleted(full_name));
}

/// Entry point for the watch command.
///
/// Builds the index, then watches the ref store and applies changes as they
/// arrive. Runs until the watcher channel closes.
///
/// # Errors
///
/// Returns errors from repository discovery, config loading, indexing, or watcher setup.
pub fn run(json: bool) -> Result<(), Error> {
    let (git, config) = commands::open_repository()?;
    let mut index = RepoIndex::load(&git, &config)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let git_dir = git.git_dir().to_path_buf();
    let mut watcher = create_watcher(tx, &git_dir)?;

    let refs_dir = git_dir.join("refs");
    watcher.watch(&refs_dir, RecursiveMode::Recursive).map_err(|e| {
        return Error::Watch {
            path: refs_dir.clone(),
            reason: e.to_string(),
        };
    })?;
    // Non-recursive on the git dir itself, for packed-refs.
    watcher.watch(&git_dir, RecursiveMode::NonRecursive).map_err(|e| {
        return Error::Watch {
            path: git_dir.clone(),
            reason: e.to_string(),
        };
    })?;

    let ref_count = index.refs.len();
    eprintln!("watch: tracking {ref_count} refs, press Ctrl+C to stop");

    while let Ok(first) = rx.recv() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        let mut paths = vec![first];
        while let Ok(path) = rx.recv_timeout(debounce) {
            paths.push(path);
        }
        let events = events_for_paths(&git_dir, &paths, |p| return p.is_file());
        if events.is_empty() {
            continue;
        }

        let applied = apply_ref_events(&mut index, &events, &config, || return git.list_refs())?;
        for event in &applied {
            tracing::info!(?event, "ref index updated");
            print_event(event, json)?;
        }
        if !applied.is_empty() {
            let ref_count = index.refs.len();
            eprintln!("watch: {ref_count} refs");
        }
    }

    return Ok(());
}

/// Print one applied event as text or a JSON line.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
fn print_event(event: &RefEvent, json: bool) -> Result<(), Error> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        RefEvent::Created(name) => println!("+ {name}"),
        RefEvent::Deleted(name) => println!("- {name}"),
        RefEvent::Repacked => println!("* packed-refs reloaded"),
    }
    return Ok(());
}
