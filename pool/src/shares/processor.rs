/// Share Processing Pipeline - job lookup + validation + result reporting
///
/// Flow for one submitted share:
/// 1. Resolve the job id through the repository
/// 2. Optionally refuse superseded jobs (`reject_stale_jobs`)
/// 3. Grade the share
/// 4. Publish block solutions exactly once
/// 5. Record metrics

use std::sync::Arc;

use super::reporter::ResultReporter;
use super::share::{DifficultyLadder, Share, ShareStatus, WorkerIdentity};
use super::validator::{PolicyFlags, ShareValidator};
use crate::chain::ChainPow;
use crate::error::Result;
use crate::jobs::JobRepository;
use crate::metrics::prometheus as metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareOutcome {
    pub status: ShareStatus,
    pub assigned_difficulty: Option<u64>,
    /// The share's job had been superseded by a newer height.
    pub stale: bool,
}

pub struct ShareProcessor<C: ChainPow> {
    repository: Arc<JobRepository<C>>,
    validator: ShareValidator<C>,
    reporter: ResultReporter,
    policy: PolicyFlags,
}

impl<C: ChainPow> ShareProcessor<C> {
    pub fn new(repository: Arc<JobRepository<C>>, reporter: ResultReporter, policy: PolicyFlags) -> Self {
        if policy.reject_stale_jobs {
            tracing::info!("ShareProcessor: shares for stale jobs are rejected");
        }
        Self {
            repository,
            validator: ShareValidator::new(),
            reporter,
            policy,
        }
    }

    pub fn repository(&self) -> &Arc<JobRepository<C>> {
        &self.repository
    }

    pub fn policy(&self) -> &PolicyFlags {
        &self.policy
    }

    /// Grade a share and report it if it solves a block.
    ///
    /// A publish failure is returned as an error; the share keeps its
    /// `Solved` verdict and the job table is untouched.
    pub async fn process(
        &self,
        share: &mut Share,
        ladder: &DifficultyLadder,
        worker: &WorkerIdentity,
    ) -> Result<ShareOutcome> {
        let handle = self.repository.lookup(share.job_id);
        let stale = handle.as_ref().map(|h| h.is_stale()).unwrap_or(false);

        if stale {
            metrics::inc_stale_shares();
        }

        let status = if stale && self.policy.reject_stale_jobs {
            tracing::debug!("share for stale job {:x} from {} rejected", share.job_id, worker.full_name);
            share.assigned_difficulty = None;
            share.set_status(ShareStatus::JobNotFound)
        } else {
            self.validator
                .check(share, handle.as_deref(), ladder, &self.policy, &worker.full_name)
        };

        metrics::inc_share(status.as_str());

        let outcome = ShareOutcome {
            status,
            assigned_difficulty: share.assigned_difficulty,
            stale,
        };

        if status == ShareStatus::Solved {
            if let Some(handle) = handle.as_ref() {
                self.reporter
                    .publish(share, handle.job(), &share.proof, worker)
                    .await?;
            }
        }

        Ok(outcome)
    }
}
