//! Lazy per-tenant accumulator registry.
//!
//! One accumulator per tenant identity, created on first access under a
//! mutex so concurrent first-access races resolve to a single instance.
//! Removal settles in-flight work, flushes a final snapshot, and joins the
//! consumer task.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tokio::task::JoinHandle;

use crate::error::Result;
use crate::storage;

use super::accumulator::{Accumulator, TimerHandle};

struct TimerEntry {
    handle: TimerHandle,
    join: JoinHandle<()>,
}

/// Maps tenant ids to running accumulators.
pub struct TimerRegistry {
    data_dir: PathBuf,
    timers: Mutex<HashMap<String, TimerEntry>>,
}

impl TimerRegistry {
    /// Registry over the default data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be prepared.
    pub fn new() -> Result<Self> {
        Ok(Self::with_data_dir(storage::data_dir()?))
    }

    /// Registry over an explicit data directory (tests, embedders).
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// The tenant's timer handle, spawning its accumulator on first access.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns an error if a fresh accumulator fails to load its documents.
    pub fn timer(&self, tenant_id: &str) -> Result<TimerHandle> {
        let mut timers = self.timers.lock().unwrap();
        if let Some(entry) = timers.get(tenant_id) {
            if !entry.handle.is_closed() {
                return Ok(entry.handle.clone());
            }
            // A previous task shut down out-of-band; replace it.
            timers.remove(tenant_id);
        }

        let (handle, join) = Accumulator::spawn(&self.data_dir, tenant_id)?;
        timers.insert(
            tenant_id.to_string(),
            TimerEntry {
                handle: handle.clone(),
                join,
            },
        );
        Ok(handle)
    }

    /// Tenants with a live accumulator.
    pub fn active_tenants(&self) -> Vec<String> {
        let timers = self.timers.lock().unwrap();
        timers
            .iter()
            .filter(|(_, entry)| !entry.handle.is_closed())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Dispose of one tenant's accumulator: settle in-flight commands,
    /// flush the final snapshot, join the task.
    pub async fn remove(&self, tenant_id: &str) {
        let entry = { self.timers.lock().unwrap().remove(tenant_id) };
        if let Some(entry) = entry {
            let _ = entry.handle.flush().await;
            entry.handle.shutdown();
            if let Err(e) = entry.join.await {
                tracing::error!(tenant_id, error = %e, "Timer task join failed");
            }
        }
    }

    /// Dispose of every accumulator. Called on process shutdown.
    pub async fn shutdown_all(&self) {
        let entries: Vec<(String, TimerEntry)> = {
            let mut timers = self.timers.lock().unwrap();
            timers.drain().collect()
        };
        for (tenant_id, entry) in entries {
            let _ = entry.handle.flush().await;
            entry.handle.shutdown();
            if let Err(e) = entry.join.await {
                tracing::error!(tenant_id = %tenant_id, error = %e, "Timer task join failed");
            }
        }
    }
}
