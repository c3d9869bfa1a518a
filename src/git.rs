//! Thin wrapper over the git executable: every repository fact gitlinks needs
//! comes from one of these subprocess calls.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::Error;
use crate::matchers::CommitLookup;

/// A discovered repository and the git executable used to query it.
#[derive(Debug, Clone)]
pub struct Git {
    /// Absolute path of the `.git` directory (or the linked worktree's git dir).
    git_dir: PathBuf,
    /// Executable to spawn.
    program: String,
    /// Absolute path of the work tree root.
    work_tree: PathBuf,
}

impl Git {
    /// Diff two files outside the index, as for an unsaved editor buffer against
    /// the file on disk. Exit status 1 only means the files differ.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed` for exit statuses other than 0 and 1.
    pub fn diff_no_index(&self, old: &Path, new: &Path) -> Result<String, Error> {
        let old_arg = old.to_string_lossy();
        let new_arg = new.to_string_lossy();
        let args = ["diff", "--no-index", "--no-color", "--no-ext-diff", "--unified=0", "--", &*old_arg, &*new_arg];
        let output = self.spawn(&args)?;
        return match output.status.code() {
            Some(0 | 1) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            _ => Err(failure(&args, &output)),
        };
    }

    /// Zero-context diff of one path. `revisions` are passed through verbatim
    /// (empty for index vs work tree, `["--cached"]` for HEAD vs index, a revision
    /// for that revision vs the work tree).
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed` if git rejects the revisions or path.
    pub fn diff_unified0(&self, revisions: &[&str], path: &Path) -> Result<String, Error> {
        let path_arg = path.to_string_lossy();
        let mut args = vec!["diff", "--no-color", "--no-ext-diff", "--unified=0"];
        args.extend_from_slice(revisions);
        args.push("--");
        args.push(&*path_arg);
        return self.run(&args);
    }

    /// Find the repository containing `cwd`.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitUnavailable` if git cannot be spawned, or
    /// `Error::NotARepository` if `cwd` is outside any work tree.
    pub fn discover(program: &str, cwd: &Path) -> Result<Self, Error> {
        let output = Command::new(program)
            .arg("-C")
            .arg(cwd)
            .args(["rev-parse", "--show-toplevel", "--absolute-git-dir"])
            .output()
            .map_err(|source| return Error::GitUnavailable { program: program.to_string(), source })?;

        if !output.status.success() {
            return Err(Error::NotARepository { path: cwd.to_path_buf() });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();
        let (Some(work_tree), Some(git_dir)) = (lines.next(), lines.next()) else {
            return Err(Error::NotARepository { path: cwd.to_path_buf() });
        };

        tracing::debug!(work_tree, git_dir, "discovered repository");
        return Ok(Self {
            git_dir: PathBuf::from(git_dir),
            program: program.to_string(),
            work_tree: PathBuf::from(work_tree),
        });
    }

    /// Absolute path of the git directory.
    pub fn git_dir(&self) -> &Path {
        return &self.git_dir;
    }

    /// Every tracked path, relative to the work tree root.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed` if `ls-files` fails.
    pub fn list_files(&self) -> Result<Vec<String>, Error> {
        let output = self.run(&["ls-files", "-z"])?;
        return Ok(split_nul_terminated(&output));
    }

    /// Every full ref name (`refs/heads/main`, `refs/tags/v1`, ...).
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed` if `for-each-ref` fails.
    pub fn list_refs(&self) -> Result<Vec<String>, Error> {
        let output = self.run(&["for-each-ref", "--format=%(refname)"])?;
        return Ok(output.lines().filter(|l| return !l.is_empty()).map(String::from).collect());
    }

    /// Run git in the work tree and return stdout, failing on a non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitUnavailable` or `Error::GitFailed`.
    fn run(&self, args: &[&str]) -> Result<String, Error> {
        let output = self.spawn(args)?;
        if !output.status.success() {
            return Err(failure(args, &output));
        }
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    /// Spawn git in the work tree and wait for it.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitUnavailable` if the process cannot be started.
    fn spawn(&self, args: &[&str]) -> Result<Output, Error> {
        tracing::debug!(args = %args.join(" "), "git");
        return Command::new(&self.program)
            .args(args)
            .current_dir(&self.work_tree)
            .output()
            .map_err(|source| {
                return Error::GitUnavailable {
                    program: self.program.clone(),
                    source,
                };
            });
    }

    /// Absolute path of the work tree root.
    pub fn work_tree(&self) -> &Path {
        return &self.work_tree;
    }
}

impl CommitLookup for Git {
    fn resolve_commit(&self, hash: &str) -> Result<Option<String>, Error> {
        let spec = format!("{hash}^{{commit}}");
        let args = ["rev-parse", "--verify", "--quiet", spec.as_str()];
        let output = self.spawn(&args)?;
        return match output.status.code() {
            Some(0) => {
                let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Ok(Some(sha))
            },
            Some(_) => {
                tracing::debug!(hash, "not a commit in this repository");
                Ok(None)
            },
            None => Err(failure(&args, &output)),
        };
    }
}

/// Build a `GitFailed` error from a finished process.
fn failure(args: &[&str], output: &Output) -> Error {
    return Error::GitFailed {
        args: args.iter().map(|a| return (*a).to_string()).collect(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };
}

/// Split `-z` output into its entries, dropping the empty tail.
fn split_nul_terminated(output: &str) -> Vec<String> {
    return output
        .split('\0')
        .filter(|entry| return !entry.is_empty())
        .map(String::from)
        .collect();
}
