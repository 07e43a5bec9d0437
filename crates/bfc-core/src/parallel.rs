//! Parallel verification over independent working copies.
//!
//! Each worker task owns exactly one working copy and pulls candidates
//! from a shared queue, so no two verifications ever touch the same tree.
//! Results are returned in input order regardless of completion order.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::build_runner::BuildRunner;
use crate::domain::{
    BfcError, BugFixCandidate, Result, Verdict, VerificationOutcome, VerificationStage,
};
use crate::obs::emit_verify_aborted;
use crate::snapshot::SnapshotProvider;
use crate::verification::VerificationProtocol;

type Queue = Arc<Mutex<VecDeque<usize>>>;
type Slots = Arc<Mutex<Vec<Option<VerificationOutcome>>>>;

/// Verify `candidates` using one task per working copy in `workers`.
///
/// The working copies are consumed; each is left on the fix revision of
/// the last candidate it verified. A worker task that dies loses only the
/// candidate it was verifying: that candidate, and any the surviving
/// workers never reached, come back as `Aborted`. The only error is an
/// empty worker list.
pub async fn verify_parallel<R, B>(
    workers: Vec<R>,
    protocol: Arc<VerificationProtocol<B>>,
    candidates: Vec<BugFixCandidate>,
) -> Result<Vec<VerificationOutcome>>
where
    R: SnapshotProvider + 'static,
    B: BuildRunner + 'static,
{
    if workers.is_empty() {
        return Err(BfcError::Worker("no working copies supplied".to_string()));
    }

    let total = candidates.len();
    info!(workers = workers.len(), candidates = total, "Starting parallel verification");
    let candidates = Arc::new(candidates);
    let queue: Queue = Arc::new(Mutex::new((0..total).collect()));
    let slots: Slots = Arc::new(Mutex::new(vec![None; total]));

    let tasks: Vec<JoinHandle<()>> = workers
        .into_iter()
        .enumerate()
        .map(|(worker, mut repo)| {
            let queue = Arc::clone(&queue);
            let slots = Arc::clone(&slots);
            let candidates = Arc::clone(&candidates);
            let protocol = Arc::clone(&protocol);
            let span = tracing::info_span!("bfc.worker", worker = worker);
            tokio::spawn(
                async move {
                    loop {
                        let next = queue.lock().await.pop_front();
                        let Some(index) = next else {
                            break;
                        };
                        let candidate = &candidates[index];
                        debug!(index = index, commit = %candidate.commit.id.short(), "Picked candidate");
                        let outcome = protocol.verify(&mut repo, candidate).await;
                        slots.lock().await[index] = Some(outcome);
                    }
                }
                .instrument(span),
            )
        })
        .collect();

    let mut failure = None;
    for (worker, joined) in futures::future::join_all(tasks).await.into_iter().enumerate() {
        if let Err(e) = joined {
            warn!(worker = worker, error = %e, "Verification worker failed");
            failure.get_or_insert_with(|| BfcError::Worker(e.to_string()).to_string());
        }
    }

    let slots = std::mem::take(&mut *slots.lock().await);
    let outcomes: Vec<VerificationOutcome> = slots
        .into_iter()
        .zip(candidates.iter())
        .map(|(slot, candidate)| {
            slot.unwrap_or_else(|| {
                let error = failure
                    .clone()
                    .unwrap_or_else(|| "candidate was never verified".to_string());
                emit_verify_aborted(candidate.commit.id.as_str(), VerificationStage::Init, &error);
                VerificationOutcome::early(
                    candidate.clone(),
                    Verdict::Aborted {
                        stage: VerificationStage::Init,
                        error,
                    },
                )
            })
        })
        .collect();

    info!(
        verified = outcomes.iter().filter(|o| o.verified).count(),
        "Parallel verification finished"
    );
    Ok(outcomes)
}
