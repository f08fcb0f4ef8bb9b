/// Share Validator - grades one share against its job
///
/// Order of checks:
/// 1. Job must resolve (stale jobs are still graded)
/// 2. Proof must verify against the job's header commitment
/// 3. Network difficulty met -> block solution
/// 4. Otherwise the highest ladder difficulty met is credited
///
/// The validator holds no shared state; the stale flag is only read.

use std::marker::PhantomData;

use super::share::{DifficultyLadder, Share, ShareStatus};
use crate::chain::ChainPow;
use crate::config::PolicySettings;
use crate::jobs::JobHandle;
use crate::metrics::prometheus as metrics;

/// Grading switches, read once per share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyFlags {
    /// Every verified proof is a block solution.
    pub accept_all_as_solved: bool,
    /// Every verified proof is credited at the highest ladder difficulty.
    pub accept_all_as_simulated: bool,
    pub reject_stale_jobs: bool,
    pub high_diff_ratio: u64,
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self::from(&PolicySettings::default())
    }
}

impl From<&PolicySettings> for PolicyFlags {
    fn from(s: &PolicySettings) -> Self {
        Self {
            accept_all_as_solved: s.accept_all_as_solved,
            accept_all_as_simulated: s.accept_all_as_simulated,
            reject_stale_jobs: s.reject_stale_jobs,
            high_diff_ratio: s.high_diff_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShareValidator<C: ChainPow> {
    _chain: PhantomData<C>,
}

impl<C: ChainPow> ShareValidator<C> {
    pub fn new() -> Self {
        Self { _chain: PhantomData }
    }

    /// Assign exactly one verdict to `share` and return it.
    ///
    /// On `Accept` the share's `assigned_difficulty` is the ladder entry it
    /// was credited at.
    pub fn check(
        &self,
        share: &mut Share,
        job: Option<&JobHandle<C>>,
        ladder: &DifficultyLadder,
        policy: &PolicyFlags,
        worker_name: &str,
    ) -> ShareStatus {
        share.assigned_difficulty = None;

        let Some(handle) = job else {
            tracing::debug!("job {:x} not found for worker {}", share.job_id, worker_name);
            return share.set_status(ShareStatus::JobNotFound);
        };
        let job = handle.job();

        if share.height != job.height {
            tracing::debug!(
                "share height {} does not match job {:x} height {}",
                share.height,
                job.job_id,
                job.height
            );
            return share.set_status(ShareStatus::InvalidSolution);
        }

        if !C::verify_proof(&job.header, share.nonce, share.edge_bits, &share.proof) {
            tracing::debug!(
                "invalid proof from {} (job={:x}, nonce={:x}, edge_bits={})",
                worker_name,
                job.job_id,
                share.nonce,
                share.edge_bits
            );
            return share.set_status(ShareStatus::InvalidSolution);
        }

        let share_diff = C::compute_difficulty(job.height, share.edge_bits, job.secondary_scaling, &share.proof);
        let network_diff = job.network_difficulty;

        if let Some(ratio) = share_diff.checked_div(network_diff) {
            if ratio >= policy.high_diff_ratio {
                tracing::info!(
                    "high diff share, worker: {}, share difficulty: {}, network difficulty: {}",
                    worker_name,
                    share_diff,
                    network_diff
                );
                metrics::inc_high_diff_shares();
            }
        }

        if policy.accept_all_as_solved || share_diff >= network_diff {
            tracing::info!(
                "🎉 solution found, worker: {}, height: {}, share difficulty: {}, network difficulty: {}",
                worker_name,
                job.height,
                share_diff,
                network_diff
            );
            return share.set_status(ShareStatus::Solved);
        }

        for diff in ladder.descending() {
            if policy.accept_all_as_simulated || share_diff >= diff {
                tracing::debug!("share difficulty {} >= job difficulty {}", share_diff, diff);
                share.assigned_difficulty = Some(diff);
                return share.set_status(ShareStatus::Accept);
            }
            tracing::debug!("share difficulty {} < job difficulty {}", share_diff, diff);
        }

        share.set_status(ShareStatus::LowDifficulty)
    }
}
