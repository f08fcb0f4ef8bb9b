/// Per-connection sessions
///
/// Tracks for each miner connection:
/// - Session id and peer address
/// - Current share difficulty
/// - Difficulties offered while each job was current (the job's ladder)
/// - Job notifications from the repository

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::chain::ChainPow;
use crate::config::SessionSettings;
use crate::error::{PoolError, Result};
use crate::jobs::JobNotify;
use crate::metrics::prometheus as metrics;
use crate::shares::{DifficultyLadder, Share, ShareOutcome, ShareProcessor, WorkerIdentity};

/// What the transport knows about a freshly accepted connection.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub peer_addr: SocketAddr,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionContext {
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self { peer_addr, connected_at: Utc::now() }
    }
}

/// Builds one session object per inbound connection.
///
/// Must not block. On error the transport logs and drops the connection.
pub trait ConnectionFactory: Send + Sync {
    type Session: Send;

    fn create(&self, ctx: ConnectionContext) -> Result<Self::Session>;
}

pub struct GrinSessionFactory<C: ChainPow> {
    processor: Arc<ShareProcessor<C>>,
    default_difficulty: u64,
    max_sessions: usize,
    live: Arc<AtomicUsize>,
}

impl<C: ChainPow> GrinSessionFactory<C> {
    pub fn new(processor: Arc<ShareProcessor<C>>, settings: &SessionSettings) -> Self {
        Self {
            processor,
            default_difficulty: settings.default_difficulty.max(1),
            max_sessions: settings.max_sessions,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn live_sessions(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

impl<C: ChainPow> ConnectionFactory for GrinSessionFactory<C> {
    type Session = GrinSession<C>;

    fn create(&self, ctx: ConnectionContext) -> Result<GrinSession<C>> {
        let live = self.live.fetch_add(1, Ordering::AcqRel);
        if live >= self.max_sessions {
            self.live.fetch_sub(1, Ordering::AcqRel);
            metrics::inc_session_create_errors();
            tracing::warn!(
                "⚠️  Connection from {} refused: {} live sessions (max {})",
                ctx.peer_addr,
                live,
                self.max_sessions
            );
            return Err(PoolError::SessionRejected(format!(
                "session limit {} reached",
                self.max_sessions
            )));
        }

        let mut session = GrinSession {
            session_id: Uuid::new_v4(),
            peer_addr: ctx.peer_addr,
            connected_at: ctx.connected_at,
            jobs: self.processor.repository().subscribe(),
            processor: self.processor.clone(),
            difficulty: self.default_difficulty,
            current_job_id: None,
            job_ladders: HashMap::new(),
            live: self.live.clone(),
        };

        // miners connecting mid-height work on the current job right away
        if let Some(job) = self.processor.repository().latest() {
            session.on_job(&JobNotify { job, is_clean: true });
        }

        metrics::inc_sessions_created();
        tracing::info!("🔌 New session {} from {}", session.session_id, session.peer_addr);
        Ok(session)
    }
}

pub struct GrinSession<C: ChainPow> {
    session_id: Uuid,
    peer_addr: SocketAddr,
    connected_at: DateTime<Utc>,
    processor: Arc<ShareProcessor<C>>,
    jobs: broadcast::Receiver<JobNotify<C>>,
    difficulty: u64,
    current_job_id: Option<u64>,
    job_ladders: HashMap<u64, DifficultyLadder>,
    live: Arc<AtomicUsize>,
}

impl<C: ChainPow> GrinSession<C> {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn difficulty(&self) -> u64 {
        self.difficulty
    }

    pub fn current_job_id(&self) -> Option<u64> {
        self.current_job_id
    }

    pub fn ladder(&self, job_id: u64) -> Option<&DifficultyLadder> {
        self.job_ladders.get(&job_id)
    }

    /// Retarget. Shares for the current job are also accepted at the new value.
    pub fn set_difficulty(&mut self, difficulty: u64) {
        self.difficulty = difficulty.max(1);
        if let Some(job_id) = self.current_job_id {
            self.job_ladders.entry(job_id).or_default().insert(self.difficulty);
        }
    }

    /// Track a job sent to the miner.
    pub fn on_job(&mut self, notify: &JobNotify<C>) {
        let job_id = notify.job.job_id();
        self.current_job_id = Some(job_id);
        self.job_ladders.entry(job_id).or_default().insert(self.difficulty);

        if notify.is_clean {
            let repository = self.processor.repository();
            self.job_ladders.retain(|id, _| repository.lookup(*id).is_some());
        }
    }

    /// Wait for the next job notification and track it.
    ///
    /// Returns `None` once the repository is gone. Missed notifications are
    /// skipped; only the newest job matters to a miner.
    pub async fn next_job(&mut self) -> Option<JobNotify<C>> {
        loop {
            match self.jobs.recv().await {
                Ok(notify) => {
                    self.on_job(&notify);
                    return Some(notify);
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!("Session {} skipped {} job notifications", self.session_id, missed);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Grade a share with the ladder this session offered for its job.
    pub async fn submit(&self, share: &mut Share, worker: &WorkerIdentity) -> Result<ShareOutcome> {
        let empty = DifficultyLadder::new();
        let ladder = self.job_ladders.get(&share.job_id).unwrap_or(&empty);
        self.processor.process(share, ladder, worker).await
    }
}

impl<C: ChainPow> Drop for GrinSession<C> {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}
