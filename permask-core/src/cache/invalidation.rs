//! Mask cache invalidation for multi-replica deployments
//!
//! Uses Redis Pub/Sub to broadcast invalidation messages across all nodes.
//! When one node forgets an actor or flushes every mask, all other nodes
//! receive the message and drop the matching entries from their L1 caches.

use futures::StreamExt;
use redis::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::models::UserId;
use crate::{Error, Result};

/// Cache invalidation message types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvalidationMessage {
    /// Drop every mask of one actor; `None` is the shared anonymous actor
    Actor {
        user_id: Option<String>,
    },
    /// Drop every mask
    All,
}

impl InvalidationMessage {
    #[must_use]
    pub fn actor(user_id: Option<&UserId>) -> Self {
        Self::Actor {
            user_id: user_id.map(|id| id.as_str().to_string()),
        }
    }
}

/// Service for broadcasting and receiving cache invalidation messages
#[derive(Clone)]
pub struct CacheInvalidationService {
    /// Redis client for pub/sub
    redis_client: Option<Client>,
    /// Fully prefixed channel name
    channel: String,
    /// Local broadcast sender for invalidation events
    local_sender: broadcast::Sender<InvalidationMessage>,
    /// Node identifier for logging
    node_id: String,
    shutdown: Arc<std::sync::atomic::AtomicBool>,
}

impl CacheInvalidationService {
    /// Create a new cache invalidation service
    ///
    /// # Arguments
    /// * `redis_client` - Optional Redis client. If None, only local invalidation is used.
    /// * `channel` - Pub/Sub channel shared by every node
    /// * `node_id` - Unique identifier for this node (for logging)
    #[must_use]
    pub fn new(redis_client: Option<Client>, channel: String, node_id: String) -> Self {
        let (local_sender, _) = broadcast::channel(1024);

        Self {
            redis_client,
            channel,
            local_sender,
            node_id,
            shutdown: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Start listening for invalidation messages from Redis
    ///
    /// Spawns a background task subscribed to the channel. Received messages
    /// are re-broadcast locally to every [`subscribe`](Self::subscribe)r.
    pub fn start(&self) {
        let Some(client) = self.redis_client.clone() else {
            info!("Redis not configured, mask cache invalidation is local-only");
            return;
        };

        let local_sender = self.local_sender.clone();
        let channel = self.channel.clone();
        let node_id = self.node_id.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                if shutdown.load(std::sync::atomic::Ordering::Relaxed) {
                    debug!("Cache invalidation listener shutting down");
                    break;
                }

                match Self::run_subscriber(&client, &channel, &local_sender, &node_id, shutdown.clone()).await {
                    Ok(()) => break,
                    Err(e) => {
                        error!(
                            error = %e,
                            "Cache invalidation subscriber error, reconnecting in 5 seconds..."
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }
            info!("Cache invalidation listener stopped");
        });
    }

    async fn run_subscriber(
        client: &Client,
        channel: &str,
        local_sender: &broadcast::Sender<InvalidationMessage>,
        node_id: &str,
        shutdown: Arc<std::sync::atomic::AtomicBool>,
    ) -> Result<()> {
        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| Error::Internal(format!("Failed to get Redis Pub/Sub connection: {e}")))?;

        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| Error::Internal(format!("Failed to subscribe: {e}")))?;

        info!(
            node_id = %node_id,
            channel = %channel,
            "Subscribed to mask cache invalidation channel"
        );

        let mut message_stream = pubsub.on_message();

        loop {
            if shutdown.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }

            // Timeout so the shutdown flag is polled
            match tokio::time::timeout(std::time::Duration::from_secs(1), message_stream.next()).await {
                Ok(Some(msg)) => {
                    let payload: String = match msg.get_payload() {
                        Ok(p) => p,
                        Err(e) => {
                            warn!(error = %e, "Invalid payload in cache invalidation message");
                            continue;
                        }
                    };

                    match serde_json::from_str::<InvalidationMessage>(&payload) {
                        Ok(invalidation) => {
                            debug!(
                                node_id = %node_id,
                                ?invalidation,
                                "Received cache invalidation message"
                            );

                            if let Err(e) = local_sender.send(invalidation) {
                                warn!(error = %e, "Failed to broadcast invalidation locally");
                            }
                        }
                        Err(e) => {
                            warn!(
                                error = %e,
                                json = %payload,
                                "Failed to parse invalidation message"
                            );
                        }
                    }
                }
                Ok(None) => {
                    info!("Redis Pub/Sub stream ended, reconnecting...");
                    return Err(Error::Internal("Redis Pub/Sub stream ended".to_string()));
                }
                Err(_) => continue,
            }
        }

        Ok(())
    }

    pub fn stop(&self) {
        self.shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    /// Subscribe to invalidation events received from every node
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationMessage> {
        self.local_sender.subscribe()
    }

    /// Broadcast a message to the OTHER nodes via Redis
    ///
    /// Does not broadcast locally: the caller invalidates its own L1 directly.
    /// Without Redis this is a no-op.
    pub async fn broadcast_remote(&self, message: InvalidationMessage) -> Result<()> {
        if let Some(ref client) = self.redis_client {
            let json = serde_json::to_string(&message)?;

            let mut conn = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| Error::StorageUnavailable(format!("Redis connection failed: {e}")))?;

            redis::AsyncCommands::publish::<_, _, ()>(&mut conn, &self.channel, json)
                .await
                .map_err(|e| Error::Internal(format!("Failed to publish invalidation: {e}")))?;

            debug!(
                node_id = %self.node_id,
                ?message,
                "Published cache invalidation message"
            );
        }

        Ok(())
    }

    /// Broadcast a message to ALL nodes including this one
    pub async fn broadcast_all(&self, message: InvalidationMessage) -> Result<()> {
        if let Err(e) = self.local_sender.send(message.clone()) {
            warn!(error = %e, "Failed to broadcast invalidation locally");
        }

        self.broadcast_remote(message).await
    }

    pub async fn invalidate_actor(&self, user_id: Option<&UserId>) -> Result<()> {
        self.broadcast_remote(InvalidationMessage::actor(user_id)).await
    }

    pub async fn invalidate_all(&self) -> Result<()> {
        self.broadcast_remote(InvalidationMessage::All).await
    }
}

impl std::fmt::Debug for CacheInvalidationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInvalidationService")
            .field("redis_enabled", &self.redis_client.is_some())
            .field("channel", &self.channel)
            .field("node_id", &self.node_id)
            .finish()
    }
}
