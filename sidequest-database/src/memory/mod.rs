use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, broadcast};

use crate::model::user_stats::{CreateOutcome, FieldWrite, StatsRecord};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Process-local document store with the same contract as the Postgres
/// backend: create-if-absent, batched atomic writes, and change fan-out.
#[derive(Clone, Debug)]
pub struct MemoryStatsStore {
    records: Arc<Mutex<HashMap<String, StatsRecord>>>,
    changes: broadcast::Sender<String>,
    offline: Arc<AtomicBool>,
}

impl Default for MemoryStatsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            changes,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulate a network outage: every read, write, and watch fails while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn get(&self, key: &str) -> anyhow::Result<Option<StatsRecord>> {
        self.ensure_online(key)?;
        Ok(self.records.lock().await.get(key).copied())
    }

    pub async fn create(&self, key: &str, record: StatsRecord) -> anyhow::Result<CreateOutcome> {
        self.ensure_online(key)?;
        {
            let mut records = self.records.lock().await;
            if records.contains_key(key) {
                return Ok(CreateOutcome::AlreadyExists);
            }
            records.insert(key.to_owned(), record);
        }

        self.notify(key);
        Ok(CreateOutcome::Created)
    }

    /// Apply every write under a single lock, so a batch is never observed
    /// half-applied.
    pub async fn update(&self, key: &str, writes: &[FieldWrite]) -> anyhow::Result<()> {
        self.ensure_online(key)?;
        {
            let mut records = self.records.lock().await;
            let record = records
                .get_mut(key)
                .ok_or_else(|| anyhow::anyhow!("stats record `{key}` does not exist"))?;
            for write in writes {
                record.apply(write);
            }
        }

        self.notify(key);
        Ok(())
    }

    pub fn watch(&self, key: &str) -> anyhow::Result<MemoryWatch> {
        self.ensure_online(key)?;
        Ok(MemoryWatch {
            key: key.to_owned(),
            receiver: self.changes.subscribe(),
        })
    }

    fn notify(&self, key: &str) {
        // no receivers is fine
        let _ = self.changes.send(key.to_owned());
    }

    fn ensure_online(&self, key: &str) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            anyhow::bail!("memory stats store is offline (key `{key}`)");
        }
        Ok(())
    }
}

/// Change feed for a single key.
#[derive(Debug)]
pub struct MemoryWatch {
    key: String,
    receiver: broadcast::Receiver<String>,
}

impl MemoryWatch {
    /// Wait until the watched record changes.
    pub async fn changed(&mut self) -> anyhow::Result<()> {
        loop {
            match self.receiver.recv().await {
                Ok(key) if key == self.key => return Ok(()),
                Ok(_) => continue,
                // Missed notifications may include ours; the caller re-reads anyway.
                Err(broadcast::error::RecvError::Lagged(_)) => return Ok(()),
                Err(broadcast::error::RecvError::Closed) => {
                    anyhow::bail!("memory stats store closed while watching `{}`", self.key)
                }
            }
        }
    }
}
