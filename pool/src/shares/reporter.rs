/// Result Reporter - hands block solutions to the downstream result channel
///
/// A solved share becomes a JSON `SolvedShareRecord`. The sink decides where it
/// goes: Redis (list append + notify) in production, an in-process channel in
/// tests and embedded setups. Sink errors are always returned to the caller.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use super::share::{Share, WorkerIdentity};
use crate::chain::ChainPow;
use crate::error::{PoolError, Result};
use crate::jobs::Job;
use crate::metrics::prometheus as metrics;

pub const DEFAULT_WORKER_NAME: &str = "__default__";

/// Outbound record for a block solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolvedShareRecord {
    pub job_id: u64,
    pub node_job_id: u64,
    pub height: u64,
    pub edge_bits: u8,
    pub nonce: u64,
    pub proofs: Vec<u64>,
    pub user_id: i32,
    pub worker_id: i64,
    pub worker_full_name: String,
}

impl SolvedShareRecord {
    pub fn new<C: ChainPow>(share: &Share, job: &Job<C>, proof: &[u64], worker: &WorkerIdentity) -> Self {
        Self {
            job_id: job.job_id,
            node_job_id: job.node_job_id,
            height: job.height,
            edge_bits: share.edge_bits,
            nonce: share.nonce,
            proofs: proof.to_vec(),
            user_id: worker.user_id,
            worker_id: worker.worker_id,
            worker_full_name: filter_worker_name(&worker.full_name),
        }
    }
}

/// Keep only characters that are safe in downstream records.
pub fn filter_worker_name(name: &str) -> String {
    let filtered: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '|' | '^' | '/'))
        .collect();

    if filtered.is_empty() {
        DEFAULT_WORKER_NAME.to_string()
    } else {
        filtered
    }
}

/// Destination for serialized solved-share records.
#[async_trait]
pub trait SolvedShareSink: Send + Sync {
    async fn publish(&self, payload: String) -> Result<()>;
}

/// Appends records to a Redis list and announces them on a pub/sub channel.
pub struct RedisSolvedShareSink {
    client: redis::Client,
    connection: Mutex<Option<redis::aio::ConnectionManager>>,
    list_key: String,
    notify_channel: String,
}

impl RedisSolvedShareSink {
    pub fn new(redis_url: &str, list_key: &str, notify_channel: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| PoolError::Config(format!("redis url {}: {}", redis_url, e)))?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
            list_key: list_key.to_string(),
            notify_channel: notify_channel.to_string(),
        })
    }

    /// Lazily established, shared by every publish.
    async fn get_connection(&self) -> Result<redis::aio::ConnectionManager> {
        let mut guard = self.connection.lock().await;

        if guard.is_none() {
            let manager = self
                .client
                .get_connection_manager()
                .await
                .map_err(|e| PoolError::PublishFailure(format!("redis connect: {}", e)))?;
            *guard = Some(manager);
        }

        guard
            .clone()
            .ok_or_else(|| PoolError::PublishFailure("redis connection unavailable".to_string()))
    }
}

#[async_trait]
impl SolvedShareSink for RedisSolvedShareSink {
    async fn publish(&self, payload: String) -> Result<()> {
        let mut conn = self.get_connection().await?;

        conn.rpush::<_, _, ()>(&self.list_key, &payload)
            .await
            .map_err(|e| PoolError::PublishFailure(format!("rpush {}: {}", self.list_key, e)))?;

        if !self.notify_channel.is_empty() {
            conn.publish::<_, _, ()>(&self.notify_channel, &payload)
                .await
                .map_err(|e| PoolError::PublishFailure(format!("publish {}: {}", self.notify_channel, e)))?;
        }
        Ok(())
    }
}

/// In-process sink backed by a tokio channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SolvedShareSink for ChannelSink {
    async fn publish(&self, payload: String) -> Result<()> {
        self.tx
            .send(payload)
            .map_err(|_| PoolError::PublishFailure("result channel closed".to_string()))
    }
}

#[derive(Clone)]
pub struct ResultReporter {
    sink: Arc<dyn SolvedShareSink>,
}

impl ResultReporter {
    pub fn new(sink: Arc<dyn SolvedShareSink>) -> Self {
        Self { sink }
    }

    /// Serialize and send one solved share.
    pub async fn publish<C: ChainPow>(
        &self,
        share: &Share,
        job: &Job<C>,
        proof: &[u64],
        worker: &WorkerIdentity,
    ) -> Result<()> {
        let record = SolvedShareRecord::new(share, job, proof, worker);
        let payload = serde_json::to_string(&record)?;

        match self.sink.publish(payload).await {
            Ok(()) => {
                metrics::inc_solved_published();
                tracing::info!(
                    "📦 solved share published: job={:x}, height={}, worker={}",
                    record.job_id,
                    record.height,
                    record.worker_full_name
                );
                Ok(())
            }
            Err(e) => {
                metrics::inc_publish_failures();
                tracing::error!("solved share for job {:x} not published: {}", record.job_id, e);
                Err(e)
            }
        }
    }
}
