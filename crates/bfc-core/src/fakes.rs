//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `MemoryRepository`, `ScriptedBuildRunner`, `OracleBuildRunner`
//! and `StaticIssueTracker` that satisfy the trait contracts without git,
//! a build tool, or the network.
//!
//! `MemoryRepository` mirrors its working tree into a scratch directory so
//! that build runners observe exactly what a real checkout would contain.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::build_runner::BuildRunner;
use crate::discovery::{IssueEvent, IssueTracker, TrackedIssue};
use crate::domain::{BfcError, BuildReport, ChangeKind, ChangedPath, Commit, Result, RevisionId};
use crate::snapshot::{validate_overlay_path, SnapshotProvider};

/// File tree: relative path to content.
pub type Tree = BTreeMap<String, Vec<u8>>;

fn tree_diff(old: &Tree, new: &Tree) -> Vec<ChangedPath> {
    let mut changes = Vec::new();
    for (path, content) in new {
        match old.get(path) {
            None => changes.push(ChangedPath::new(path.clone(), ChangeKind::Added)),
            Some(previous) if previous != content => {
                changes.push(ChangedPath::new(path.clone(), ChangeKind::Modified))
            }
            Some(_) => {}
        }
    }
    for path in old.keys() {
        if !new.contains_key(path) {
            changes.push(ChangedPath::new(path.clone(), ChangeKind::Deleted));
        }
    }
    changes
}

/// Read every file under `root` into a tree.
pub fn read_tree(root: &Path) -> Tree {
    fn walk(root: &Path, dir: &Path, tree: &mut Tree) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, tree);
            } else if let (Ok(rel), Ok(content)) = (path.strip_prefix(root), std::fs::read(&path)) {
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect::<Vec<_>>()
                    .join("/");
                tree.insert(key, content);
            }
        }
    }

    let mut tree = Tree::new();
    walk(root, root, &mut tree);
    tree
}

// ---------------------------------------------------------------------------
// MemoryRepository
// ---------------------------------------------------------------------------

/// In-memory snapshot provider with a scratch directory as working copy.
#[derive(Debug)]
pub struct MemoryRepository {
    dir: tempfile::TempDir,
    commits: HashMap<RevisionId, Commit>,
    trees: HashMap<RevisionId, Tree>,
    order: Vec<RevisionId>,
    working: Tree,
    head: Option<RevisionId>,
    checkouts: Vec<RevisionId>,
    failing_checkouts: HashSet<RevisionId>,
    fail_overlays: bool,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create scratch working copy"),
            commits: HashMap::new(),
            trees: HashMap::new(),
            order: Vec::new(),
            working: Tree::new(),
            head: None,
            checkouts: Vec::new(),
            failing_checkouts: HashSet::new(),
            fail_overlays: false,
        }
    }

    /// Record a commit whose full tree is `files`. Changed paths are
    /// computed against the first parent.
    pub fn add_commit(
        &mut self,
        id: &str,
        message: &str,
        parents: &[&str],
        files: &[(&str, &str)],
    ) -> Commit {
        let tree: Tree = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
            .collect();
        let base = parents
            .first()
            .and_then(|p| self.trees.get(&RevisionId::from(*p)))
            .cloned()
            .unwrap_or_default();
        let changes = tree_diff(&base, &tree);
        self.insert(id, message, parents, tree, changes)
    }

    /// Like [`add_commit`](Self::add_commit) but with explicit changed
    /// paths, e.g. to report renames.
    pub fn add_commit_with_changes(
        &mut self,
        id: &str,
        message: &str,
        parents: &[&str],
        files: &[(&str, &str)],
        changes: Vec<ChangedPath>,
    ) -> Commit {
        let tree: Tree = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
            .collect();
        self.insert(id, message, parents, tree, changes)
    }

    fn insert(
        &mut self,
        id: &str,
        message: &str,
        parents: &[&str],
        tree: Tree,
        changed_paths: Vec<ChangedPath>,
    ) -> Commit {
        let id = RevisionId::from(id);
        let commit = Commit {
            id: id.clone(),
            message: message.to_string(),
            parent_ids: parents.iter().map(|p| RevisionId::from(*p)).collect(),
            changed_paths,
        };
        self.commits.insert(id.clone(), commit.clone());
        self.trees.insert(id.clone(), tree);
        self.order.push(id);
        commit
    }

    /// Make every checkout of `revision` fail.
    pub fn fail_checkout_of(&mut self, revision: &str) {
        self.failing_checkouts.insert(RevisionId::from(revision));
    }

    /// Make every overlay fail.
    pub fn fail_overlays(&mut self) {
        self.fail_overlays = true;
    }

    /// Revisions checked out so far, in order.
    pub fn checkouts(&self) -> Vec<RevisionId> {
        self.checkouts.clone()
    }

    pub fn working_file(&self, path: &str) -> Option<&[u8]> {
        self.working.get(path).map(Vec::as_slice)
    }

    fn materialize(&self) -> std::io::Result<()> {
        for entry in std::fs::read_dir(self.dir.path())? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        for (path, content) in &self.working {
            write_file(&self.dir.path().join(path), content)?;
        }
        Ok(())
    }
}

fn write_file(target: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(target, content)
}

impl SnapshotProvider for MemoryRepository {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn head(&self) -> Result<RevisionId> {
        self.head
            .clone()
            .ok_or_else(|| BfcError::Git("no revision checked out".to_string()))
    }

    fn history(&self) -> Result<Vec<RevisionId>> {
        Ok(self.order.iter().rev().cloned().collect())
    }

    fn commit(&self, revision: &RevisionId) -> Result<Commit> {
        self.commits
            .get(revision)
            .cloned()
            .ok_or_else(|| BfcError::resolution(revision.as_str(), "unknown revision"))
    }

    fn resolve_parent(&self, revision: &RevisionId) -> Result<Option<Commit>> {
        let commit = self.commit(revision)?;
        match commit.first_parent() {
            Some(parent) => self.commit(parent).map(Some),
            None => Ok(None),
        }
    }

    fn diff(&self, from: &RevisionId, to: &RevisionId) -> Result<Vec<ChangedPath>> {
        let target = self.commit(to)?;
        if target.first_parent() == Some(from) {
            return Ok(target.changed_paths);
        }
        let old = self
            .trees
            .get(from)
            .ok_or_else(|| BfcError::resolution(from.as_str(), "unknown revision"))?;
        let new = self
            .trees
            .get(to)
            .ok_or_else(|| BfcError::resolution(to.as_str(), "unknown revision"))?;
        Ok(tree_diff(old, new))
    }

    fn checkout(&mut self, revision: &RevisionId) -> Result<()> {
        if self.failing_checkouts.contains(revision) {
            return Err(BfcError::checkout(revision.as_str(), "simulated checkout failure"));
        }
        let tree = self
            .trees
            .get(revision)
            .cloned()
            .ok_or_else(|| BfcError::checkout(revision.as_str(), "unknown revision"))?;
        self.working = tree;
        self.head = Some(revision.clone());
        self.checkouts.push(revision.clone());
        self.materialize()
            .map_err(|e| BfcError::checkout(revision.as_str(), e.to_string()))
    }

    fn read_file_at(&self, revision: &RevisionId, path: &str) -> Result<Option<Vec<u8>>> {
        let tree = self
            .trees
            .get(revision)
            .ok_or_else(|| BfcError::resolution(revision.as_str(), "unknown revision"))?;
        Ok(tree.get(path).cloned())
    }

    fn overlay(&mut self, path: &str, content: &[u8]) -> Result<()> {
        validate_overlay_path(path)?;
        if self.fail_overlays {
            return Err(BfcError::overlay(path, "simulated overlay failure"));
        }
        self.working.insert(path.to_string(), content.to_vec());
        write_file(&self.dir.path().join(path), content)
            .map_err(|e| BfcError::overlay(path, e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Build runners
// ---------------------------------------------------------------------------

/// Returns queued reports in order and records the tree each run saw.
///
/// Once the script is exhausted every run reports an infrastructure
/// failure.
#[derive(Debug, Default)]
pub struct ScriptedBuildRunner {
    script: Mutex<VecDeque<BuildReport>>,
    snapshots: Mutex<Vec<Tree>>,
    roots: Mutex<Vec<PathBuf>>,
}

impl ScriptedBuildRunner {
    pub fn new(script: Vec<BuildReport>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            snapshots: Mutex::new(Vec::new()),
            roots: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    /// Working-tree contents observed by each run.
    pub fn snapshots(&self) -> Vec<Tree> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildRunner for ScriptedBuildRunner {
    async fn run(&self, working_copy: &Path) -> BuildReport {
        self.snapshots.lock().unwrap().push(read_tree(working_copy));
        self.roots.lock().unwrap().push(working_copy.to_path_buf());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| BuildReport::infrastructure("build script exhausted"))
    }
}

/// Decides each run from the tree on disk, so results do not depend on
/// call order.
pub struct OracleBuildRunner<F> {
    oracle: F,
    calls: Mutex<usize>,
}

impl<F> OracleBuildRunner<F>
where
    F: Fn(&Tree) -> BuildReport + Send + Sync,
{
    pub fn new(oracle: F) -> Self {
        Self {
            oracle,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl<F> BuildRunner for OracleBuildRunner<F>
where
    F: Fn(&Tree) -> BuildReport + Send + Sync,
{
    async fn run(&self, working_copy: &Path) -> BuildReport {
        *self.calls.lock().unwrap() += 1;
        (self.oracle)(&read_tree(working_copy))
    }
}

// ---------------------------------------------------------------------------
// StaticIssueTracker
// ---------------------------------------------------------------------------

/// Issue tracker answering from fixed data.
#[derive(Debug, Default)]
pub struct StaticIssueTracker {
    issues: Vec<TrackedIssue>,
    events: HashMap<u64, Vec<IssueEvent>>,
    failing: HashSet<u64>,
}

impl StaticIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(mut self, number: u64, events: Vec<IssueEvent>) -> Self {
        self.issues.push(TrackedIssue {
            number,
            title: format!("issue {number}"),
        });
        self.events.insert(number, events);
        self
    }

    /// An issue whose events cannot be fetched.
    pub fn with_failing_issue(mut self, number: u64) -> Self {
        self.issues.push(TrackedIssue {
            number,
            title: format!("issue {number}"),
        });
        self.failing.insert(number);
        self
    }
}

#[async_trait]
impl IssueTracker for StaticIssueTracker {
    async fn closed_bug_issues(&self, _repo: &str) -> Result<Vec<TrackedIssue>> {
        Ok(self.issues.clone())
    }

    async fn issue_events(&self, _repo: &str, number: u64) -> Result<Vec<IssueEvent>> {
        if self.failing.contains(&number) {
            return Err(BfcError::Tracker(format!("events for #{number} unavailable")));
        }
        Ok(self.events.get(&number).cloned().unwrap_or_default())
    }
}
