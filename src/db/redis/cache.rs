use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppResult;
use crate::models::ContentKind;

/// Keys for provider responses worth keeping around
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    TitleSearch(ContentKind, String),
    Details(ContentKind, u64),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::TitleSearch(kind, query) => {
                write!(f, "search:{}:{}", kind, query.trim().to_lowercase())
            }
            CacheKey::Details(kind, id) => write!(f, "details:{}:{}", kind, id),
        }
    }
}

/// Creates a Redis client for caching
///
/// `Client::open` only validates the URL; connections are made lazily.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Read-through cache for metadata provider responses
///
/// Reads hit Redis directly. Writes are queued to a background task so a slow
/// Redis never delays a response. Redis being unavailable is treated as a
/// miss: the provider is still asked and the request succeeds.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer after draining queued writes
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates the cache and spawns its writer task on the current runtime
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::run_writer(client, write_rx, shutdown_rx).await;
        });

        (
            Self {
                redis_client,
                write_tx,
            },
            CacheWriterHandle { shutdown_tx },
        )
    }

    async fn run_writer(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer task started");
        let mut failed_writes: u64 = 0;

        loop {
            tokio::select! {
                Some(write) = write_rx.recv() => {
                    if let Err(e) = Self::write(&client, write).await {
                        failed_writes += 1;
                        tracing::warn!(error = %e, failed_writes, "Cache write failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    while let Some(write) = write_rx.recv().await {
                        if let Err(e) = Self::write(&client, write).await {
                            tracing::warn!(error = %e, "Cache write failed during shutdown");
                        }
                    }
                    tracing::info!(failed_writes, "Cache writer stopped");
                    break;
                }
            }
        }
    }

    async fn write(client: &Client, write: PendingWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(write.key, write.value, write.ttl).await?;
        Ok(())
    }

    async fn read_raw(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        Ok(conn.get(key).await?)
    }

    /// Looks a value up, returning `None` on a miss, a Redis failure, or an
    /// entry that no longer deserializes into `T`
    pub async fn lookup<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let key = key.to_string();
        let raw = match self.read_raw(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Queues a value for storage; returns immediately
    pub fn store<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            value,
            ttl,
        };

        if self.write_tx.send(write).is_err() {
            tracing::warn!("Cache writer is gone, dropping write");
        }
    }
}
