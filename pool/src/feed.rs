/// Template Feed - Redis pub/sub subscription feeding the job repository
///
/// Every message on the template channel is one raw notification. Malformed
/// notifications are logged, counted and dropped; the subscription keeps going.
/// A lost subscription is re-established after `RECONNECT_DELAY`.

use anyhow::{anyhow, Result};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::chain::ChainPow;
use crate::jobs::{JobHandle, JobRepository};
use crate::metrics::prometheus as metrics;

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

pub struct TemplateFeed<C: ChainPow> {
    repository: Arc<JobRepository<C>>,
    client: redis::Client,
    channel: String,
}

impl<C: ChainPow> TemplateFeed<C> {
    pub fn new(repository: Arc<JobRepository<C>>, redis_url: &str, channel: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| anyhow!("Failed to create Redis client: {}", e))?;

        tracing::info!("TemplateFeed: chain={} channel={}", C::NAME, channel);
        Ok(Self {
            repository,
            client,
            channel: channel.to_string(),
        })
    }

    /// Ingest and publish one raw notification.
    pub fn handle(&self, payload: &[u8]) -> Option<Arc<JobHandle<C>>> {
        match self.repository.ingest(payload) {
            Ok(job) => Some(self.repository.publish(job)),
            Err(e) => {
                metrics::inc_malformed_templates();
                tracing::warn!("Dropping template notification: {}", e);
                None
            }
        }
    }

    /// Consume the template channel until the task is cancelled.
    pub async fn run(self) {
        loop {
            match self.subscribe_once().await {
                Ok(()) => tracing::warn!("Template subscription on {} ended", self.channel),
                Err(e) => tracing::error!("Template subscription on {} failed: {}", self.channel, e),
            }
            time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn subscribe_once(&self) -> Result<()> {
        let mut pubsub = self.client.get_async_connection().await?.into_pubsub();
        pubsub.subscribe(&self.channel).await?;
        tracing::info!("📡 Subscribed to template channel {}", self.channel);

        let mut messages = pubsub.on_message();
        while let Some(msg) = messages.next().await {
            match msg.get_payload::<Vec<u8>>() {
                Ok(payload) => {
                    self.handle(&payload);
                }
                Err(e) => {
                    metrics::inc_malformed_templates();
                    tracing::warn!("Unreadable template payload: {}", e);
                }
            }
        }
        Ok(())
    }
}
