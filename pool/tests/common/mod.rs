#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use grin_pool::chain::ChainPow;
use grin_pool::config::JobSettings;
use grin_pool::jobs::{Job, JobRepository};
use grin_pool::shares::{PolicyFlags, ResultReporter, Share, ShareProcessor, SolvedShareSink};
use grin_pool::{PoolError, Result};

/// Chain whose proofs verify when they hold 42 ascending elements.
/// The difficulty of a proof is its first element.
#[derive(Debug, Clone, Copy)]
pub struct TestChain;

impl ChainPow for TestChain {
    type Header = u64;
    const NAME: &'static str = "test";

    fn decode_header(bytes: &[u8]) -> std::result::Result<u64, PoolError> {
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| PoolError::MalformedTemplate("header must be 8 bytes".to_string()))?;
        Ok(u64::from_be_bytes(arr))
    }

    fn encode_header(header: &u64) -> String {
        hex::encode(header.to_be_bytes())
    }

    fn header_height(header: &u64) -> u64 {
        *header
    }

    fn secondary_scaling(_header: &u64) -> u32 {
        1
    }

    fn verify_proof(_header: &u64, _nonce: u64, _edge_bits: u8, proof: &[u64]) -> bool {
        proof.len() == 42 && proof.windows(2).all(|w| w[0] < w[1])
    }

    fn compute_difficulty(_height: u64, _edge_bits: u8, _scaling: u32, proof: &[u64]) -> u64 {
        proof.first().copied().unwrap_or(0)
    }
}

pub fn job(job_id: u64, height: u64, network_difficulty: u64) -> Job<TestChain> {
    Job {
        job_id,
        node_job_id: job_id + 1000,
        height,
        header: height,
        network_difficulty,
        secondary_scaling: 1,
    }
}

pub fn repository(retained_heights: usize) -> Arc<JobRepository<TestChain>> {
    Arc::new(JobRepository::new(0, &JobSettings { retained_heights, broadcast_capacity: 64 }))
}

pub fn proof(difficulty: u64) -> Vec<u64> {
    (0..42).map(|i| difficulty + i).collect()
}

pub fn share(job_id: u64, height: u64, difficulty: u64) -> Share {
    Share::new(job_id, height, 0x1234, 31, proof(difficulty))
}

/// Records every payload it is handed.
#[derive(Default)]
pub struct CountingSink {
    pub calls: AtomicUsize,
    pub payloads: Mutex<Vec<String>>,
}

#[async_trait]
impl SolvedShareSink for CountingSink {
    async fn publish(&self, payload: String) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().push(payload);
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl SolvedShareSink for FailingSink {
    async fn publish(&self, _payload: String) -> Result<()> {
        Err(PoolError::PublishFailure("result channel unavailable".to_string()))
    }
}

pub fn processor(
    repository: Arc<JobRepository<TestChain>>,
    sink: Arc<dyn SolvedShareSink>,
    policy: PolicyFlags,
) -> ShareProcessor<TestChain> {
    ShareProcessor::new(repository, ResultReporter::new(sink), policy)
}
