//! Best-effort remote sync
//!
//! Saved entries are POSTed one at a time to a dashboard endpoint. Local
//! storage is the record of truth, so push failures are logged at debug level
//! and otherwise ignored: no retry, no error surfaced to the tracker.

use crate::config::SyncConfig;
use crate::error::{FormKeepError, Result};
use crate::types::BackupEntry;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::debug;

/// Destination for synced entries
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Deliver one entry
    async fn push(&self, entry: &BackupEntry) -> Result<()>;
}

/// POSTs entries as JSON to the dashboard endpoint
pub struct HttpSyncTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSyncTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SyncTransport for HttpSyncTransport {
    async fn push(&self, entry: &BackupEntry) -> Result<()> {
        let response = self.client.post(&self.endpoint).json(entry).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FormKeepError::Other(format!(
                "dashboard rejected entry {}: HTTP {}",
                entry.id, status
            )));
        }
        Ok(())
    }
}

/// Rate-limited, fire-and-forget sync of pending entries
pub struct RemoteSync {
    transport: Arc<dyn SyncTransport>,
    min_interval: Duration,
    /// Upper bound on waiting for in-flight pushes at shutdown
    drain_timeout: Duration,
    last_sync: Option<Instant>,
}

impl RemoteSync {
    pub fn new(transport: Arc<dyn SyncTransport>, min_interval: Duration) -> Self {
        Self {
            transport,
            min_interval,
            drain_timeout: Duration::from_secs(10),
            last_sync: None,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Build an HTTP sync from configuration, `None` when no endpoint is set
    pub fn from_config(config: &SyncConfig) -> Result<Option<Self>> {
        let Some(endpoint) = &config.endpoint else {
            return Ok(None);
        };
        let transport = HttpSyncTransport::new(endpoint.clone(), config.timeout)?;
        Ok(Some(
            Self::new(Arc::new(transport), config.interval).with_drain_timeout(config.timeout),
        ))
    }

    /// Whether enough time has passed since the last round
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_sync {
            None => true,
            Some(last) => now.duration_since(last) >= self.min_interval,
        }
    }

    /// Spawn one push per entry and record the round
    pub fn dispatch(&mut self, entries: Vec<BackupEntry>, now: Instant) -> Vec<JoinHandle<()>> {
        self.last_sync = Some(now);
        debug!("Syncing {} entries to dashboard", entries.len());

        entries
            .into_iter()
            .map(|entry| {
                let transport = self.transport.clone();
                tokio::spawn(async move {
                    if let Err(e) = transport.push(&entry).await {
                        debug!("Sync of entry {} failed: {}", entry.id, e);
                    }
                })
            })
            .collect()
    }

    /// Wait for dispatched pushes to finish, bounded by the drain timeout
    ///
    /// Returns how many pushes ran to completion (successfully or not).
    pub async fn drain(&self, handles: Vec<JoinHandle<()>>) -> usize {
        let total = handles.len();
        let mut finished = 0usize;
        let wait = async {
            for handle in handles {
                if handle.await.is_ok() {
                    finished += 1;
                }
            }
        };

        let outcome = timeout(self.drain_timeout, wait).await;
        if outcome.is_err() {
            debug!("Gave up waiting for {} of {} sync pushes", total - finished, total);
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryEnvironment, EntryId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        pushed: Mutex<Vec<EntryId>>,
    }

    #[async_trait]
    impl SyncTransport for RecordingTransport {
        async fn push(&self, entry: &BackupEntry) -> Result<()> {
            self.pushed.lock().unwrap().push(entry.id.clone());
            Ok(())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl SyncTransport for FailingTransport {
        async fn push(&self, _entry: &BackupEntry) -> Result<()> {
            Err(FormKeepError::Other("connection refused".to_string()))
        }
    }

    fn entry() -> BackupEntry {
        BackupEntry::new("contact", "Contact", "s1", &[], EntryEnvironment::default())
    }

    #[test]
    fn test_rate_limit() {
        let sync = RemoteSync::new(Arc::new(RecordingTransport::default()), Duration::from_secs(60));
        let now = Instant::now();
        assert!(sync.ready(now));

        let mut sync = sync;
        sync.last_sync = Some(now);
        assert!(!sync.ready(now + Duration::from_secs(59)));
        assert!(sync.ready(now + Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_dispatch_pushes_each_entry() {
        let transport = Arc::new(RecordingTransport::default());
        let mut sync = RemoteSync::new(transport.clone(), Duration::from_secs(60));

        let entries = vec![entry(), entry()];
        let now = Instant::now();
        for handle in sync.dispatch(entries, now) {
            handle.await.unwrap();
        }

        assert_eq!(transport.pushed.lock().unwrap().len(), 2);
        assert!(!sync.ready(now));
    }

    #[tokio::test]
    async fn test_push_failures_are_swallowed() {
        let mut sync = RemoteSync::new(Arc::new(FailingTransport), Duration::from_secs(60));
        for handle in sync.dispatch(vec![entry()], Instant::now()) {
            assert!(handle.await.is_ok());
        }
    }

    struct SlowTransport {
        delay: Duration,
        pushed: Mutex<Vec<EntryId>>,
    }

    #[async_trait]
    impl SyncTransport for SlowTransport {
        async fn push(&self, entry: &BackupEntry) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.pushed.lock().unwrap().push(entry.id.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_pushes() {
        let transport = Arc::new(SlowTransport {
            delay: Duration::from_millis(20),
            pushed: Mutex::new(Vec::new()),
        });
        let mut sync = RemoteSync::new(transport.clone(), Duration::from_secs(60));

        let handles = sync.dispatch(vec![entry(), entry()], Instant::now());
        assert_eq!(sync.drain(handles).await, 2);
        assert_eq!(transport.pushed.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_is_bounded() {
        let transport = Arc::new(SlowTransport {
            delay: Duration::from_secs(30),
            pushed: Mutex::new(Vec::new()),
        });
        let mut sync = RemoteSync::new(transport.clone(), Duration::from_secs(60))
            .with_drain_timeout(Duration::from_secs(1));

        let started = Instant::now();
        let handles = sync.dispatch(vec![entry()], started);
        assert_eq!(sync.drain(handles).await, 0);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(transport.pushed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_from_config_without_endpoint() {
        let sync = RemoteSync::from_config(&SyncConfig::default()).unwrap();
        assert!(sync.is_none());
    }
}
