//! Git working copy backed by the `git` command line.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, info};

use crate::domain::{BfcError, ChangeKind, ChangedPath, Commit, Result, RevisionId};
use crate::snapshot::{validate_overlay_path, SnapshotProvider};

/// Object id of the empty tree, used as the diff base of root commits.
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Capture the HEAD commit SHA from a git repository.
///
/// Runs `git rev-parse HEAD` in the given directory. Returns an error if the
/// directory is not inside a git repository or if git is not available.
pub fn capture_head_sha(repo_dir: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(repo_dir)
        .output()
        .map_err(|e| BfcError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BfcError::Git(format!("git rev-parse HEAD failed: {stderr}")));
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if sha.is_empty() {
        return Err(BfcError::Git(
            "git rev-parse HEAD returned empty output".to_string(),
        ));
    }

    Ok(sha)
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Directory name for a clone of `url`: the last path segment without a
/// trailing `.git`.
pub fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// A git working copy on disk.
#[derive(Debug)]
pub struct GitWorkingCopy {
    root: PathBuf,
}

impl GitWorkingCopy {
    /// Open an existing working copy.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !is_git_repo(&root) {
            return Err(BfcError::Git(format!(
                "{} is not a git working copy",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Reuse the working copy at `dest` if it exists, otherwise clone `url`
    /// into it.
    pub fn clone_or_open(url: &str, dest: &Path) -> Result<Self> {
        if dest.exists() {
            info!(path = %dest.display(), "Repository already exists, opening it");
            return Self::open(dest);
        }

        info!(url = %url, path = %dest.display(), "Cloning repository");
        let output = Command::new("git")
            .arg("clone")
            .arg("--quiet")
            .arg(url)
            .arg(dest)
            .output()
            .map_err(|e| BfcError::Git(format!("failed to run git: {e}")))?;
        if !output.status.success() {
            return Err(BfcError::Git(format!(
                "git clone {url} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Self::open(dest)
    }

    /// Independent clone of this working copy, for a parallel worker.
    pub fn clone_local(&self, dest: &Path) -> Result<Self> {
        let source = self.root.to_string_lossy().to_string();
        Self::clone_or_open(&source, dest)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(args = ?args, "git");
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| BfcError::Git(format!("failed to run git: {e}")))
    }

    /// Run git and return stdout, mapping a non-zero exit through `on_error`.
    fn run_ok(&self, args: &[&str], on_error: impl FnOnce(String) -> BfcError) -> Result<Vec<u8>> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(on_error(stderr));
        }
        Ok(output.stdout)
    }

    fn git_error<'a>(args: &'a [&'a str]) -> impl FnOnce(String) -> BfcError + 'a {
        move |stderr| BfcError::Git(format!("git {} failed: {stderr}", args.join(" ")))
    }
}

/// Parse `git diff --name-status -z` output.
fn parse_name_status(raw: &[u8]) -> Result<Vec<ChangedPath>> {
    let text = String::from_utf8_lossy(raw);
    let mut fields = text.split('\0').filter(|f| !f.is_empty());
    let mut changes = Vec::new();

    while let Some(status) = fields.next() {
        let kind = ChangeKind::from_status(status)
            .ok_or_else(|| BfcError::Git(format!("unknown diff status {status:?}")))?;
        let first = fields
            .next()
            .ok_or_else(|| BfcError::Git(format!("diff entry {status} has no path")))?;

        // Renames and copies carry a source and a destination path.
        if status.starts_with('R') || status.starts_with('C') {
            let second = fields
                .next()
                .ok_or_else(|| BfcError::Git(format!("diff entry {status} has no target")))?;
            if kind == ChangeKind::Renamed {
                changes.push(ChangedPath::renamed(first, second));
            } else {
                changes.push(ChangedPath::new(second, kind));
            }
        } else {
            changes.push(ChangedPath::new(first, kind));
        }
    }

    Ok(changes)
}

impl SnapshotProvider for GitWorkingCopy {
    fn root(&self) -> &Path {
        &self.root
    }

    fn head(&self) -> Result<RevisionId> {
        capture_head_sha(&self.root).map(RevisionId)
    }

    fn history(&self) -> Result<Vec<RevisionId>> {
        let args = ["rev-list", "--all"];
        let stdout = self.run_ok(&args, Self::git_error(&args))?;
        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .filter(|l| !l.is_empty())
            .map(RevisionId::from)
            .collect())
    }

    fn commit(&self, revision: &RevisionId) -> Result<Commit> {
        let spec = format!("{}^{{commit}}", revision);
        let stdout = self.run_ok(
            &["show", "-s", "--no-color", "--format=%H%x00%P%x00%B", &spec],
            |stderr| BfcError::resolution(revision.as_str(), stderr),
        )?;
        let text = String::from_utf8_lossy(&stdout);
        let mut parts = text.splitn(3, '\0');
        let id = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BfcError::resolution(revision.as_str(), "empty commit header"))?;
        let parent_ids: Vec<RevisionId> = parts
            .next()
            .unwrap_or("")
            .split_whitespace()
            .map(RevisionId::from)
            .collect();
        let message = parts.next().unwrap_or("").trim_end().to_string();

        let id = RevisionId(id);
        let base = parent_ids
            .first()
            .cloned()
            .unwrap_or_else(|| RevisionId::from(EMPTY_TREE));
        let changed_paths = self.diff(&base, &id)?;

        Ok(Commit {
            id,
            message,
            parent_ids,
            changed_paths,
        })
    }

    fn resolve_parent(&self, revision: &RevisionId) -> Result<Option<Commit>> {
        let stdout = self.run_ok(
            &["rev-list", "--parents", "-n", "1", revision.as_str()],
            |stderr| BfcError::resolution(revision.as_str(), stderr),
        )?;
        let line = String::from_utf8_lossy(&stdout);
        match line.split_whitespace().nth(1) {
            Some(parent) => self.commit(&RevisionId::from(parent)).map(Some),
            None => Ok(None),
        }
    }

    fn diff(&self, from: &RevisionId, to: &RevisionId) -> Result<Vec<ChangedPath>> {
        let args = [
            "diff",
            "--no-color",
            "--no-ext-diff",
            "--name-status",
            "-z",
            "-M",
            from.as_str(),
            to.as_str(),
            "--",
        ];
        let stdout = self.run_ok(&args, Self::git_error(&args))?;
        parse_name_status(&stdout)
    }

    fn checkout(&mut self, revision: &RevisionId) -> Result<()> {
        debug!(revision = %revision.short(), "Checking out");
        self.run_ok(
            &["checkout", "--force", "--quiet", "--detach", revision.as_str()],
            |stderr| BfcError::checkout(revision.as_str(), stderr),
        )?;
        // Overlaid files that were untracked at this revision would survive a
        // forced checkout; drop them so the tree is exact.
        self.run_ok(&["clean", "-f", "-d", "-q"], |stderr| {
            BfcError::checkout(revision.as_str(), stderr)
        })?;
        Ok(())
    }

    fn read_file_at(&self, revision: &RevisionId, path: &str) -> Result<Option<Vec<u8>>> {
        let stdout = self.run_ok(
            &["ls-tree", "-z", revision.as_str(), "--", path],
            |stderr| BfcError::resolution(revision.as_str(), stderr),
        )?;
        let listing = String::from_utf8_lossy(&stdout);
        let entry = match listing.split('\0').find(|e| !e.is_empty()) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        // "<mode> <type> <object>\t<path>"
        let meta = entry.split('\t').next().unwrap_or("");
        let mut meta = meta.split_whitespace();
        let object_type = meta.nth(1);
        let object = meta.next();
        match (object_type, object) {
            (Some("blob"), Some(object)) => {
                let args = ["cat-file", "blob", object];
                let content = self.run_ok(&args, Self::git_error(&args))?;
                Ok(Some(content))
            }
            _ => Ok(None),
        }
    }

    fn overlay(&mut self, path: &str, content: &[u8]) -> Result<()> {
        validate_overlay_path(path)?;
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BfcError::overlay(path, e.to_string()))?;
        }
        std::fs::write(&target, content).map_err(|e| BfcError::overlay(path, e.to_string()))
    }
}
