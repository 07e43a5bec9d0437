//! BFC - Bug-Fix Commit harvester CLI
//!
//! The `bfc` command mines a repository for bug-fixing commits and checks
//! each one with a fail-then-pass replay of its own test changes.
//!
//! ## Commands
//!
//! - `harvest`: Discover candidates and write `<repo>_bfcs.json`
//! - `verify`: Verify candidates and write `<repo>_verified.json`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Instrument, Level};

use bfc_build::{BuildConfig, ProcessBuildRunner};
use bfc_core::{
    candidates_path, emit_harvest_finished, emit_harvest_started, extract_issue_id, harvest_span,
    read_candidates_json, repo_name_from_url, summary_path, verified_path, verify_parallel,
    write_candidates_json, write_outcomes_json, write_summary_json, BugFixCandidate,
    CandidateSource, ClosingEventPolicy, GitWorkingCopy, HarvestConfig, HarvestReport,
    HarvestSpan, HarvestSummary, Harvester, HistoryScan, IssueEventDiscovery, KeywordClassifier,
    RevisionId, SnapshotProvider, TestChangeIsolator, VerificationProtocol, METRICS,
};
use bfc_tracker::{repo_slug_from_url, GitHubClient};

#[derive(Parser)]
#[command(name = "bfc")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bug-fix commit harvester", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where candidates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// Classify every commit in the history
    History,
    /// Follow closed bug issues to their closing commit
    Issues,
}

impl Source {
    fn name(self) -> &'static str {
        match self {
            Source::History => "history",
            Source::Issues => "issues",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Discover bug-fix candidates in a repository
    Harvest {
        /// Repository URL (or local path) to clone
        url: String,

        /// Discovery strategy
        #[arg(long, value_enum, default_value = "history")]
        source: Source,

        /// Directory holding working copies
        #[arg(long, env = "BFC_WORKDIR", default_value = "bfc-work")]
        workdir: PathBuf,

        /// Directory for JSON reports
        #[arg(long, env = "BFC_OUT_DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Maximum number of changed paths in a candidate
        #[arg(long, default_value = "5")]
        max_changed_files: usize,

        /// Closing event used when an issue was reopened (first|last)
        #[arg(long, default_value = "last")]
        closing_event: ClosingEventPolicy,
    },

    /// Verify candidates with the fail-then-pass protocol
    Verify {
        /// Repository URL (or local path) to clone
        url: String,

        /// Candidates file (default: <out-dir>/<repo>_bfcs.json)
        #[arg(long)]
        candidates: Option<PathBuf>,

        /// Verify these commits instead of a candidates file
        #[arg(long = "commit")]
        commits: Vec<String>,

        /// Independent working copies to verify with
        #[arg(short, long, env = "BFC_WORKERS", default_value = "1")]
        workers: usize,

        /// Per-build timeout in seconds (0 disables it)
        #[arg(long, env = "BFC_BUILD_TIMEOUT", default_value = "1800")]
        timeout: u64,

        /// Build command overriding detection, e.g. "mvn -q test"
        #[arg(long, env = "BFC_BUILD_CMD")]
        build_cmd: Option<String>,

        /// Directory holding working copies
        #[arg(long, env = "BFC_WORKDIR", default_value = "bfc-work")]
        workdir: PathBuf,

        /// Directory for JSON reports
        #[arg(long, env = "BFC_OUT_DIR", default_value = ".")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    bfc_core::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Harvest {
            url,
            source,
            workdir,
            out_dir,
            max_changed_files,
            closing_event,
        } => {
            let config = HarvestConfig::default()
                .with_max_changed_files(max_changed_files)
                .with_closing_event(closing_event);
            cmd_harvest(&url, source, &workdir, &out_dir, &config).await
        }
        Commands::Verify {
            url,
            candidates,
            commits,
            workers,
            timeout,
            build_cmd,
            workdir,
            out_dir,
        } => {
            let config = HarvestConfig::default().with_workers(workers);
            let mut build = BuildConfig::default().with_timeout_secs(timeout);
            if let Some(command_line) = &build_cmd {
                build = build.with_command_line(command_line);
            }
            cmd_verify(
                &url,
                candidates.as_deref(),
                &commits,
                &workdir,
                &out_dir,
                &config,
                build,
            )
            .await
        }
    };

    METRICS.flush();
    result
}

/// Discover candidates and write them to `<repo>_bfcs.json`.
async fn cmd_harvest(
    url: &str,
    source: Source,
    workdir: &Path,
    out_dir: &Path,
    config: &HarvestConfig,
) -> Result<()> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let repo_name = repo_name_from_url(url);
    emit_harvest_started(&run_id, url, source.name());

    let repo = GitWorkingCopy::clone_or_open(url, &workdir.join(&repo_name))
        .with_context(|| format!("Failed to prepare working copy for {url}"))?;

    let strategy: Box<dyn CandidateSource> = match source {
        Source::History => Box::new(HistoryScan::new(Box::new(KeywordClassifier::from_config(
            config,
        )))),
        Source::Issues => {
            let slug = repo_slug_from_url(url)?;
            let tracker = GitHubClient::from_env().context("Failed to build GitHub client")?;
            Box::new(IssueEventDiscovery::new(tracker, slug, config.closing_event))
        }
    };

    let report = strategy
        .discover(&repo)
        .instrument(harvest_span(&run_id))
        .await
        .with_context(|| format!("{} discovery failed", strategy.name()))?;

    let _span = HarvestSpan::enter(&run_id);
    for skipped in &report.skipped {
        warn!(reference = %skipped.reference, reason = %skipped.reason, "Skipped");
    }

    let path = candidates_path(out_dir, &repo_name);
    write_candidates_json(&path, &report.candidates)?;

    println!("Repository: {}", repo_name);
    println!("Source: {}", source.name());
    println!("Candidates: {}", report.candidates.len());
    println!("Skipped: {}", report.skipped.len());
    println!("Written: {}", path.display());
    Ok(())
}

/// Candidates to verify: explicit `--commit` values win over the
/// candidates file.
fn load_candidates(
    repo: &dyn SnapshotProvider,
    commits: &[String],
    candidates_file: &Path,
) -> Result<Vec<BugFixCandidate>> {
    if !commits.is_empty() {
        return commits
            .iter()
            .map(|sha| {
                let commit = repo
                    .commit(&RevisionId::from(sha.as_str()))
                    .with_context(|| format!("Unknown commit {sha}"))?;
                let issue_id = extract_issue_id(&commit.message);
                Ok(BugFixCandidate::new(commit, issue_id))
            })
            .collect();
    }

    let records = read_candidates_json(candidates_file)?;
    let mut candidates = Vec::with_capacity(records.len());
    for record in records {
        match record.resolve(repo) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => warn!(commit = %record.commit_hash, error = %e, "Dropping unresolvable candidate"),
        }
    }
    Ok(candidates)
}

/// Verify candidates and write `<repo>_verified.json` plus a summary.
async fn cmd_verify(
    url: &str,
    candidates_file: Option<&Path>,
    commits: &[String],
    workdir: &Path,
    out_dir: &Path,
    config: &HarvestConfig,
    build: BuildConfig,
) -> Result<()> {
    let repo_name = repo_name_from_url(url);
    let mut repo = GitWorkingCopy::clone_or_open(url, &workdir.join(&repo_name))
        .with_context(|| format!("Failed to prepare working copy for {url}"))?;

    let default_file = candidates_path(out_dir, &repo_name);
    let candidates = load_candidates(&repo, commits, candidates_file.unwrap_or(default_file.as_path()))?;
    info!(candidates = candidates.len(), workers = config.workers, "Loaded candidates");

    let protocol = VerificationProtocol::new(ProcessBuildRunner::new(build))
        .with_isolator(TestChangeIsolator::from_config(config));

    let report = if config.workers <= 1 {
        Harvester::new(protocol)
            .verify_all(&mut repo, &candidates)
            .await
            .context("Verification run failed")?
    } else {
        let mut workers = Vec::with_capacity(config.workers);
        for i in 0..config.workers {
            let dest = workdir.join(format!("{repo_name}-worker-{i}"));
            workers.push(
                repo.clone_local(&dest)
                    .with_context(|| format!("Failed to create worker copy {}", dest.display()))?,
            );
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let outcomes = verify_parallel(workers, Arc::new(protocol), candidates)
            .instrument(harvest_span(&run_id))
            .await
            .context("Parallel verification failed")?;
        let report = HarvestReport::from_outcomes(run_id, outcomes);
        emit_harvest_finished(&report.run_id, report.total(), report.verified, report.aborted);
        report
    };

    let _span = HarvestSpan::enter(&report.run_id);
    let outcomes_file = verified_path(out_dir, &repo_name);
    write_outcomes_json(&outcomes_file, &report.outcomes)?;
    write_summary_json(
        &summary_path(out_dir, &repo_name),
        &HarvestSummary::from_report(url, &report),
    )?;

    println!("Repository: {}", repo_name);
    println!("Run ID: {}", report.run_id);
    println!("Candidates: {}", report.total());
    println!("Verified: {}", report.verified);
    for outcome in report.verified_outcomes() {
        let commit = &outcome.candidate.commit;
        match &outcome.candidate.issue_id {
            Some(issue) => println!("  {} #{} {}", commit.id.short(), issue, commit.subject()),
            None => println!("  {} {}", commit.id.short(), commit.subject()),
        }
    }
    for (reason, count) in &report.unverified {
        println!("  {reason}: {count}");
    }
    if report.build_infrastructure_failures > 0 {
        println!(
            "Build infrastructure failures: {}",
            report.build_infrastructure_failures
        );
    }
    if let Some(error) = &report.restore_error {
        println!("Working copy not restored: {error}");
    }
    println!("Written: {}", outcomes_file.display());
    Ok(())
}
