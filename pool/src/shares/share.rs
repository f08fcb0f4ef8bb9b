use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Verdict assigned to a share. Exactly one per validated share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    JobNotFound,
    InvalidSolution,
    /// Meets network difficulty: a block solution.
    Solved,
    Accept,
    LowDifficulty,
}

impl ShareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobNotFound => "job_not_found",
            Self::InvalidSolution => "invalid_solution",
            Self::Solved => "solved",
            Self::Accept => "accept",
            Self::LowDifficulty => "low_difficulty",
        }
    }

    /// Shares that count as work done for the pool.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Solved | Self::Accept)
    }
}

impl fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submitted solution. Outcome fields are filled in by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub job_id: u64,
    pub height: u64,
    pub nonce: u64,
    pub edge_bits: u8,
    pub proof: Vec<u64>,
    pub status: Option<ShareStatus>,
    pub assigned_difficulty: Option<u64>,
}

impl Share {
    pub fn new(job_id: u64, height: u64, nonce: u64, edge_bits: u8, proof: Vec<u64>) -> Self {
        Self {
            job_id,
            height,
            nonce,
            edge_bits,
            proof,
            status: None,
            assigned_difficulty: None,
        }
    }

    pub(crate) fn set_status(&mut self, status: ShareStatus) -> ShareStatus {
        self.status = Some(status);
        status
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "share(job={:x}, height={}, nonce={:x}, edge_bits={}, status={}, diff={})",
            self.job_id,
            self.height,
            self.nonce,
            self.edge_bits,
            self.status.map(|s| s.as_str()).unwrap_or("unchecked"),
            self.assigned_difficulty.unwrap_or(0)
        )
    }
}

/// Per-connection difficulties valid for a job. Consumed highest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DifficultyLadder(BTreeSet<u64>);

impl DifficultyLadder {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, difficulty: u64) -> bool {
        self.0.insert(difficulty)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn highest(&self) -> Option<u64> {
        self.0.iter().next_back().copied()
    }

    /// Thresholds from highest to lowest.
    pub fn descending(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().rev().copied()
    }
}

impl FromIterator<u64> for DifficultyLadder {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Identity of the worker that submitted a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub user_id: i32,
    pub worker_id: i64,
    pub full_name: String,
}
