/// Job Repository - authoritative job table for one chain/shard
///
/// - Builds jobs from raw template notifications
/// - Publishes jobs, marking older heights stale before the new job is visible
/// - Resolves job ids for share checks
/// - Evicts jobs older than the retained height window
/// - Notifies sessions of every published job

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::job::{Job, JobHandle};
use super::template::parse_template;
use crate::chain::ChainPow;
use crate::config::JobSettings;
use crate::error::Result;
use crate::metrics::prometheus as metrics;

/// Sent to sessions for every published job.
#[derive(Debug, Clone)]
pub struct JobNotify<C: ChainPow> {
    pub job: Arc<JobHandle<C>>,
    /// New height: miners should drop work on older jobs.
    pub is_clean: bool,
}

struct JobTable<C: ChainPow> {
    jobs: HashMap<u64, Arc<JobHandle<C>>>,
    /// `None` until the first publish, so the first job is always clean.
    last_height: Option<u64>,
    /// Distinct heights in publication order, oldest first.
    recent_heights: VecDeque<u64>,
    latest: Option<Arc<JobHandle<C>>>,
}

pub struct JobRepository<C: ChainPow> {
    chain_id: usize,
    retained_heights: usize,
    table: RwLock<JobTable<C>>,
    notify_tx: broadcast::Sender<JobNotify<C>>,
}

impl<C: ChainPow> JobRepository<C> {
    pub fn new(chain_id: usize, settings: &JobSettings) -> Self {
        let (notify_tx, _) = broadcast::channel(settings.broadcast_capacity.max(1));

        tracing::info!(
            "JobRepository: chain={} id={} retained_heights={}",
            C::NAME,
            chain_id,
            settings.retained_heights
        );

        Self {
            chain_id,
            retained_heights: settings.retained_heights.max(1),
            table: RwLock::new(JobTable {
                jobs: HashMap::new(),
                last_height: None,
                recent_heights: VecDeque::new(),
                latest: None,
            }),
            notify_tx,
        }
    }

    pub fn chain_id(&self) -> usize {
        self.chain_id
    }

    /// Parse a raw template notification. The table is not touched.
    pub fn ingest(&self, raw: &[u8]) -> Result<Job<C>> {
        parse_template::<C>(raw)
    }

    /// Make a job resolvable and notify sessions.
    ///
    /// A job at a different height than the last published one is "clean":
    /// every existing handle is marked stale under the same write lock that
    /// inserts the new handle, so no reader can resolve the new job while an
    /// older height still looks fresh.
    pub fn publish(&self, job: Job<C>) -> Arc<JobHandle<C>> {
        let handle = Arc::new(JobHandle::new(job));
        let height = handle.height();

        let (is_clean, marked, evicted, table_size) = {
            let mut table = self.table.write();

            let is_clean = table.last_height != Some(height);
            let mut marked = 0u64;
            if is_clean {
                // must happen before the insert below
                for existing in table.jobs.values() {
                    if existing.mark_stale() {
                        marked += 1;
                    }
                }
            }

            table.jobs.insert(handle.job_id(), handle.clone());
            table.last_height = Some(height);
            table.latest = Some(handle.clone());

            let evicted = if is_clean { Self::evict(&mut table, height, self.retained_heights) } else { 0 };
            (is_clean, marked, evicted, table.jobs.len())
        };

        tracing::info!(
            "broadcast stratum job {:x} (height={}, clean={})",
            handle.job_id(),
            height,
            is_clean
        );
        if is_clean {
            tracing::info!(
                "📋 New height job: height={}, network_difficulty={}, prePow={}",
                height,
                handle.job().network_difficulty,
                handle.job().header_hex()
            );
            metrics::inc_clean_jobs();
        }

        metrics::inc_jobs_published();
        metrics::inc_jobs_marked_stale_by(marked);
        metrics::inc_jobs_evicted_by(evicted);
        metrics::set_job_height(height);
        metrics::set_job_table_size(table_size);

        self.broadcast(JobNotify { job: handle.clone(), is_clean });
        handle
    }

    fn evict(table: &mut JobTable<C>, height: u64, retained: usize) -> u64 {
        table.recent_heights.retain(|h| *h != height);
        table.recent_heights.push_back(height);
        while table.recent_heights.len() > retained {
            table.recent_heights.pop_front();
        }

        let before = table.jobs.len();
        let keep = &table.recent_heights;
        table.jobs.retain(|_, h| keep.contains(&h.height()));
        (before - table.jobs.len()) as u64
    }

    /// Fan-out runs after the write lock is released.
    fn broadcast(&self, notify: JobNotify<C>) {
        match self.notify_tx.send(notify) {
            Ok(receivers) => {
                metrics::inc_job_broadcasts();
                tracing::debug!("📢 Job notification sent to {} sessions", receivers);
            }
            Err(_) => tracing::debug!("No sessions subscribed to job notifications"),
        }
    }

    /// Resolve a job id. `None` covers both unknown and evicted ids.
    pub fn lookup(&self, job_id: u64) -> Option<Arc<JobHandle<C>>> {
        self.table.read().jobs.get(&job_id).cloned()
    }

    /// Most recently published job.
    pub fn latest(&self) -> Option<Arc<JobHandle<C>>> {
        self.table.read().latest.clone()
    }

    /// Height of the last published job, 0 before the first publish.
    pub fn current_height(&self) -> u64 {
        self.table.read().last_height.unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.table.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobNotify<C>> {
        self.notify_tx.subscribe()
    }
}
