//! Git CLI working copy: discovery and verification against real
//! repositories created in temporary directories.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use bfc_core::{
    BugFixCandidate, BuildReport, BuildRunner, CandidateSource, ChangeKind, GitWorkingCopy,
    HistoryScan, RevisionId, SnapshotProvider, Verdict, VerificationProtocol,
};

fn run_git(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn make_git_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    run_git(dir.path(), &["init", "--quiet"]);
    run_git(dir.path(), &["config", "user.name", "test-user"]);
    run_git(dir.path(), &["config", "user.email", "test@example.com"]);
    run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
    dir
}

fn write(root: &Path, path: &str, content: &str) {
    let target = root.join(path);
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(target, content).unwrap();
}

fn commit_all(root: &Path, message: &str) -> RevisionId {
    run_git(root, &["add", "-A"]);
    run_git(root, &["commit", "--quiet", "-m", message]);
    RevisionId::new(run_git(root, &["rev-parse", "HEAD"]))
}

/// Repository with a buggy parent and a fix that updates code and test.
struct Fixture {
    dir: tempfile::TempDir,
    parent: RevisionId,
    fix: RevisionId,
}

fn fixture() -> Fixture {
    let dir = make_git_repo();
    let root = dir.path();
    write(root, "src/calc.txt", "2+2=5\n");
    write(root, "src/test/calc_test.txt", "expect 4\n");
    let parent = commit_all(root, "Add calculator");

    write(root, "src/calc.txt", "2+2=4\n");
    write(root, "src/test/calc_test.txt", "expect 4\nexpect 4 again\n");
    write(root, "src/test/new_case_test.txt", "expect 0\n");
    let fix = commit_all(root, "Fix addition, closes #77");

    write(root, "README.md", "docs\n");
    commit_all(root, "Update readme");
    Fixture { dir, parent, fix }
}

/// Passes when the calculator file on disk is correct.
struct CalcRunner;

#[async_trait]
impl BuildRunner for CalcRunner {
    async fn run(&self, working_copy: &Path) -> BuildReport {
        match std::fs::read_to_string(working_copy.join("src/calc.txt")) {
            Ok(content) if content.contains("2+2=4") => BuildReport::passed(),
            Ok(_) => BuildReport::failed(1),
            Err(e) => BuildReport::infrastructure(e.to_string()),
        }
    }
}

/// Records the bytes of the test files as seen on disk at build time.
struct RecordingRunner {
    seen: std::sync::Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl BuildRunner for RecordingRunner {
    async fn run(&self, working_copy: &Path) -> BuildReport {
        let bytes = std::fs::read(working_copy.join("src/test/calc_test.txt")).unwrap_or_default();
        let first = self.seen.lock().unwrap().is_empty();
        self.seen.lock().unwrap().push(bytes);
        if first {
            BuildReport::failed(1)
        } else {
            BuildReport::passed()
        }
    }
}

#[test]
fn commit_loads_parents_message_and_changes() {
    let fx = fixture();
    let repo = GitWorkingCopy::open(fx.dir.path()).unwrap();
    let commit = repo.commit(&fx.fix).unwrap();

    assert_eq!(commit.id, fx.fix);
    assert_eq!(commit.parent_ids, vec![fx.parent.clone()]);
    assert_eq!(commit.message, "Fix addition, closes #77");
    assert_eq!(commit.changed_paths.len(), 3);
    assert!(commit
        .changed_paths
        .iter()
        .any(|c| c.path == "src/test/new_case_test.txt" && c.kind == ChangeKind::Added));
}

#[test]
fn root_commit_has_no_parent_and_diffs_against_empty_tree() {
    let fx = fixture();
    let repo = GitWorkingCopy::open(fx.dir.path()).unwrap();
    assert!(repo.resolve_parent(&fx.parent).unwrap().is_none());
    let root = repo.commit(&fx.parent).unwrap();
    assert!(root.is_root());
    assert_eq!(root.changed_paths.len(), 2);
}

#[test]
fn read_file_at_does_not_touch_working_copy() {
    let fx = fixture();
    let repo = GitWorkingCopy::open(fx.dir.path()).unwrap();
    let old = repo.read_file_at(&fx.parent, "src/calc.txt").unwrap().unwrap();
    assert_eq!(old, b"2+2=5\n");
    assert!(repo.read_file_at(&fx.parent, "README.md").unwrap().is_none());
    let on_disk = std::fs::read(fx.dir.path().join("src/calc.txt")).unwrap();
    assert_eq!(on_disk, b"2+2=4\n");
}

#[test]
fn unknown_revision_is_a_resolution_error() {
    let fx = fixture();
    let repo = GitWorkingCopy::open(fx.dir.path()).unwrap();
    let missing = RevisionId::from("0000000000000000000000000000000000000000");
    assert!(matches!(
        repo.commit(&missing),
        Err(bfc_core::BfcError::Resolution { .. })
    ));
}

#[test]
fn checkout_removes_overlaid_untracked_files() {
    let fx = fixture();
    let mut repo = GitWorkingCopy::open(fx.dir.path()).unwrap();
    repo.checkout(&fx.parent).unwrap();
    repo.overlay("src/test/new_case_test.txt", b"expect 0\n").unwrap();
    repo.overlay("src/test/calc_test.txt", b"changed\n").unwrap();

    repo.checkout(&fx.parent).unwrap();
    assert!(!fx.dir.path().join("src/test/new_case_test.txt").exists());
    let restored = std::fs::read(fx.dir.path().join("src/test/calc_test.txt")).unwrap();
    assert_eq!(restored, b"expect 4\n");
    assert_eq!(repo.head().unwrap(), fx.parent);
}

#[test]
fn overlay_rejects_paths_outside_working_copy() {
    let fx = fixture();
    let mut repo = GitWorkingCopy::open(fx.dir.path()).unwrap();
    assert!(repo.overlay("../escape.txt", b"x").is_err());
    assert!(repo.overlay("/tmp/escape.txt", b"x").is_err());
}

#[tokio::test]
async fn history_scan_finds_keyword_commits() {
    let fx = fixture();
    let repo = GitWorkingCopy::open(fx.dir.path()).unwrap();
    let report = HistoryScan::default().discover(&repo).await.unwrap();

    assert_eq!(report.candidates.len(), 1);
    let candidate = &report.candidates[0];
    assert_eq!(candidate.commit.id, fx.fix);
    assert_eq!(candidate.issue_id.as_deref(), Some("77"));
}

#[tokio::test]
async fn verify_against_real_git_is_fail_then_pass() {
    let fx = fixture();
    let mut repo = GitWorkingCopy::open(fx.dir.path()).unwrap();
    let commit = repo.commit(&fx.fix).unwrap();
    let protocol = VerificationProtocol::new(CalcRunner);

    let outcome = protocol
        .verify(&mut repo, &BugFixCandidate::new(commit, Some("77".to_string())))
        .await;
    assert!(outcome.verified, "{:?}", outcome.verdict);
    assert_eq!(outcome.verdict, Verdict::Verified);
    assert_eq!(repo.head().unwrap(), fx.fix);
}

#[tokio::test]
async fn overlay_round_trip_is_byte_identical() {
    let fx = fixture();
    let mut repo = GitWorkingCopy::open(fx.dir.path()).unwrap();
    let commit = repo.commit(&fx.fix).unwrap();
    let runner = RecordingRunner {
        seen: std::sync::Mutex::new(Vec::new()),
    };
    let protocol = VerificationProtocol::new(runner);

    protocol
        .verify(&mut repo, &BugFixCandidate::new(commit, None))
        .await;

    let seen = protocol.runner().seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[0], b"expect 4\nexpect 4 again\n");
}

#[tokio::test]
async fn clone_local_gives_independent_working_copy() {
    let fx = fixture();
    let origin = GitWorkingCopy::open(fx.dir.path()).unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let mut worker = origin.clone_local(&scratch.path().join("worker-0")).unwrap();

    worker.checkout(&fx.parent).unwrap();
    assert_eq!(worker.head().unwrap(), fx.parent);
    assert_ne!(origin.head().unwrap(), fx.parent);

    let reopened = GitWorkingCopy::clone_or_open("unused", &scratch.path().join("worker-0")).unwrap();
    assert_eq!(reopened.head().unwrap(), fx.parent);
}
