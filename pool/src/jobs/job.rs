use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::chain::ChainPow;

/// A unit of mining work built from one template notification. Immutable.
#[derive(Debug, Clone)]
pub struct Job<C: ChainPow> {
    pub job_id: u64,
    pub node_job_id: u64,
    pub height: u64,
    /// Header commitment ("pre-pow") the proof is checked against.
    pub header: C::Header,
    pub network_difficulty: u64,
    pub secondary_scaling: u32,
}

impl<C: ChainPow> Job<C> {
    pub fn header_hex(&self) -> String {
        C::encode_header(&self.header)
    }
}

/// Shared view of a published job.
///
/// The job table and every in-flight share check hold the same `Arc`, so the
/// stale flag flipped by the repository is seen by all of them.
#[derive(Debug)]
pub struct JobHandle<C: ChainPow> {
    job: Job<C>,
    stale: AtomicBool,
    created_at: DateTime<Utc>,
}

impl<C: ChainPow> JobHandle<C> {
    pub fn new(job: Job<C>) -> Self {
        Self {
            job,
            stale: AtomicBool::new(false),
            created_at: Utc::now(),
        }
    }

    pub fn job(&self) -> &Job<C> {
        &self.job
    }

    pub fn job_id(&self) -> u64 {
        self.job.job_id
    }

    pub fn height(&self) -> u64 {
        self.job.height
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// One-way flip. Returns true if this call made the handle stale.
    pub(crate) fn mark_stale(&self) -> bool {
        !self.stale.swap(true, Ordering::AcqRel)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
