//! The per-tenant accumulator: a single-consumer state machine.
//!
//! Every mutation -- reward events, deletions, lifecycle transitions, config
//! replacement -- travels as a typed [`Command`] over one unbounded channel
//! and is applied by one task, giving a strict total order with no locking.
//! Producers hold a cloneable [`TimerHandle`]; readers observe a
//! [`TimerSnapshot`] published on a watch channel after every mutation.
//!
//! Durability: the state document is snapshotted to disk after each applied
//! command. An event that cannot enter the channel is appended to the
//! per-tenant emergency log, which the consumer replays at startup and every
//! five minutes thereafter.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::{CoreError, Result};
use crate::storage::{EmergencyLog, TenantStore};

use super::config::TimerConfig;
use super::event::{synth_message_id, ProcessedEvent, TimerEvent};
use super::reward;
use super::state::{TimerSnapshot, TimerState};

/// How often the consumer re-scans the emergency log after startup.
pub const RECOVERY_SCAN_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

/// Typed mutation commands consumed by the accumulator task.
#[derive(Debug)]
enum Command {
    Apply(TimerEvent),
    Delete { event_id: String },
    Start,
    Pause,
    Stop,
    Reset,
    UpdateConfig(Box<TimerConfig>),
    /// Barrier: acknowledged once every previously sent command is applied.
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Cloneable producer/reader handle for one tenant's accumulator.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    tenant_id: String,
    tx: mpsc::UnboundedSender<Command>,
    snapshot_rx: watch::Receiver<TimerSnapshot>,
    emergency: EmergencyLog,
}

impl TimerHandle {
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Queue a subscription (or gift subscription) reward event.
    ///
    /// Never blocks and never fails from the caller's perspective: an event
    /// the channel cannot accept takes the emergency-log detour.
    pub fn enqueue_sub(&self, user_display: &str, tier: &str, is_gift: bool, count: i64) {
        let message_id = synth_message_id("sub", &self.tenant_id);
        let event = if is_gift {
            TimerEvent::GiftSub {
                message_id,
                user_display: user_display.to_string(),
                tier: tier.to_string(),
                count,
            }
        } else {
            TimerEvent::Sub {
                message_id,
                user_display: user_display.to_string(),
                tier: tier.to_string(),
                count,
            }
        };
        tracing::info!(
            tenant_id = %self.tenant_id,
            tier,
            count,
            user = user_display,
            "Queuing sub event"
        );
        self.submit(event);
    }

    /// Queue a bits (cheer) reward event.
    pub fn enqueue_bits(&self, user_display: &str, bits: i64, count: i64) {
        let event = TimerEvent::Bits {
            message_id: synth_message_id("bits", &self.tenant_id),
            user_display: user_display.to_string(),
            bits,
            count,
        };
        tracing::info!(
            tenant_id = %self.tenant_id,
            bits,
            count,
            user = user_display,
            "Queuing bits event"
        );
        self.submit(event);
    }

    /// Queue a manual, signed time adjustment. Never deduplicated.
    pub fn add_manual_time(&self, seconds: i64, reason: &str) {
        let event = TimerEvent::Manual {
            seconds,
            reason: reason.to_string(),
        };
        tracing::info!(tenant_id = %self.tenant_id, seconds, reason, "Queuing manual event");
        self.submit(event);
    }

    fn submit(&self, event: TimerEvent) {
        if let Err(send_err) = self.tx.send(Command::Apply(event)) {
            let Command::Apply(event) = send_err.0 else {
                return;
            };
            tracing::warn!(
                tenant_id = %self.tenant_id,
                "Event queue unavailable, writing event to emergency log"
            );
            if let Err(e) = self.emergency.append(&event) {
                // The one accepted data-loss case. Embed the payload so a
                // human can recover it from the log stream.
                let payload = serde_json::to_string(&event)
                    .unwrap_or_else(|_| format!("{event:?}"));
                tracing::error!(
                    tenant_id = %self.tenant_id,
                    error = %e,
                    payload = %payload,
                    "EVENT LOST: emergency log append failed"
                );
            }
        }
    }

    /// Remove a processed event and reverse its time contribution.
    pub fn delete_event(&self, event_id: &str) -> Result<()> {
        self.send(Command::Delete {
            event_id: event_id.to_string(),
        })
    }

    /// Start the countdown, folding in pause bookkeeping when resuming.
    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    /// Pause the countdown, freezing the displayed remaining time.
    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    /// Stop the countdown; remaining time reads as zero until restarted.
    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    /// Restore the initial anchor, clear accumulated time and the event
    /// log, and re-enter the paused "ready but not started" state.
    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    /// Replace the configuration wholesale.
    pub fn update_config(&self, config: TimerConfig) -> Result<()> {
        self.send(Command::UpdateConfig(Box::new(config)))
    }

    /// Wait until every command sent before this call has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(Command::Flush(ack_tx))?;
        ack_rx.await.map_err(|_| CoreError::TimerClosed {
            tenant_id: self.tenant_id.clone(),
        })
    }

    /// Ask the consumer task to exit after a final snapshot flush.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    /// Whether the consumer task has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Current read model (config + state) as of the last applied command.
    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Remaining time right now.
    pub fn remaining_time(&self) -> chrono::Duration {
        self.snapshot_rx.borrow().remaining_at(Utc::now())
    }

    /// Whether the countdown is live right now.
    pub fn is_running(&self) -> bool {
        self.snapshot_rx.borrow().is_running_at(Utc::now())
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| CoreError::TimerClosed {
            tenant_id: self.tenant_id.clone(),
        })
    }
}

/// The consumer-side state machine. Owns config, state, and the dedup set;
/// nothing else touches them.
pub struct Accumulator {
    tenant_id: String,
    config: TimerConfig,
    state: TimerState,
    processed_ids: HashSet<String>,
    store: TenantStore,
    emergency: EmergencyLog,
    rx: mpsc::UnboundedReceiver<Command>,
    /// Recovered events re-enter through the primary queue so they share
    /// one total order with live producers.
    resubmit_tx: mpsc::UnboundedSender<Command>,
    snapshot_tx: watch::Sender<TimerSnapshot>,
    rescan_every: std::time::Duration,
}

impl Accumulator {
    /// Load the tenant's documents and spawn its consumer task.
    ///
    /// The dedup set is rebuilt from the persisted event log so redelivered
    /// events stay suppressed across restarts.
    ///
    /// # Errors
    /// Returns an error if the tenant directory cannot be prepared or an
    /// existing document fails to load.
    pub fn spawn(data_dir: &Path, tenant_id: &str) -> Result<(TimerHandle, JoinHandle<()>)> {
        Self::spawn_with_rescan(data_dir, tenant_id, RECOVERY_SCAN_INTERVAL)
    }

    /// [`Accumulator::spawn`] with a custom emergency re-scan interval.
    pub fn spawn_with_rescan(
        data_dir: &Path,
        tenant_id: &str,
        rescan_every: std::time::Duration,
    ) -> Result<(TimerHandle, JoinHandle<()>)> {
        let store = TenantStore::new(data_dir, tenant_id)?;
        let config = store.load_config()?;
        let state = store.load_state()?;
        let processed_ids = state.event_log.iter().map(|e| e.id.clone()).collect();
        let emergency = EmergencyLog::new(store.emergency_path());

        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(TimerSnapshot {
            config: config.clone(),
            state: state.clone(),
        });

        let mut accumulator = Accumulator {
            tenant_id: tenant_id.to_string(),
            config,
            state,
            processed_ids,
            store,
            emergency: emergency.clone(),
            rx,
            resubmit_tx: tx.clone(),
            snapshot_tx,
            rescan_every,
        };
        // Startup recovery runs before the handle is handed out, so stranded
        // events are already queued ahead of anything a caller sends.
        accumulator.replay_emergency();
        let join = tokio::spawn(accumulator.run());

        Ok((
            TimerHandle {
                tenant_id: tenant_id.to_string(),
                tx,
                snapshot_rx,
                emergency,
            },
            join,
        ))
    }

    async fn run(mut self) {
        let mut rescan = interval_at(Instant::now() + self.rescan_every, self.rescan_every);
        rescan.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => self.handle(command),
                },
                _ = rescan.tick() => self.replay_emergency(),
            }
        }

        // Final snapshot so nothing applied in-memory outlives the task
        // only in RAM.
        self.persist_state();
        tracing::info!(tenant_id = %self.tenant_id, "Timer consumer stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Apply(event) => self.apply_event(event),
            Command::Delete { event_id } => self.delete_event(&event_id),
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Stop => self.stop(),
            Command::Reset => self.reset(),
            Command::UpdateConfig(config) => self.update_config(*config),
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
            // Handled by the run loop.
            Command::Shutdown => {}
        }
        self.publish();
    }

    fn apply_event(&mut self, event: TimerEvent) {
        if let Some(id) = event.message_id() {
            if self.processed_ids.contains(id) {
                tracing::info!(tenant_id = %self.tenant_id, message_id = id, "Duplicate event skipped");
                return;
            }
        }

        let reward = reward::calculate(&event, &self.config);
        let applies = match event {
            // Manual adjustments are signed; anything nonzero applies.
            TimerEvent::Manual { .. } => reward.seconds != 0,
            _ => reward.seconds > 0,
        };
        if !applies {
            return;
        }

        let id = event
            .message_id()
            .map(str::to_owned)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        self.state.total_added_seconds += reward.seconds;
        self.state.push_event(ProcessedEvent {
            id: id.clone(),
            timestamp: Utc::now(),
            description: reward.description.clone(),
            seconds_added: reward.seconds,
            user_display: event.user_display().unwrap_or_default().to_string(),
        });
        if event.message_id().is_some() {
            self.processed_ids.insert(id);
        }

        tracing::info!(
            tenant_id = %self.tenant_id,
            seconds = reward.seconds,
            reason = %reward.description,
            total_added = self.state.total_added_seconds,
            "Added time"
        );
        self.persist_state();
    }

    fn delete_event(&mut self, event_id: &str) {
        let Some(pos) = self.state.event_log.iter().position(|e| e.id == event_id) else {
            tracing::warn!(tenant_id = %self.tenant_id, event_id, "Delete requested for unknown event");
            return;
        };
        let removed = self.state.event_log.remove(pos);
        self.state.total_added_seconds -= removed.seconds_added;
        // The id stays in the dedup set: a redelivery of the same upstream
        // event must not resurrect a manually reverted reward.
        tracing::info!(
            tenant_id = %self.tenant_id,
            event_id,
            seconds = removed.seconds_added,
            "Deleted event"
        );
        self.persist_state();
    }

    fn start(&mut self) {
        self.state.is_stopped = false;
        if self.state.is_paused {
            if let Some(paused_at) = self.state.paused_at.take() {
                let paused_for = (Utc::now() - paused_at).num_seconds().max(0);
                self.state.total_paused_seconds += paused_for;
                tracing::info!(
                    tenant_id = %self.tenant_id,
                    total_paused = self.state.total_paused_seconds,
                    "Resuming from pause"
                );
            }
            self.state.is_paused = false;
        }
        self.persist_state();
    }

    fn pause(&mut self) {
        if self.state.is_paused {
            return;
        }
        let now = Utc::now();
        // Freeze the live projection before flipping the flag.
        let frozen = self.current_snapshot().remaining_at(now).num_seconds();
        self.state.is_paused = true;
        self.state.paused_at = Some(now);
        self.state.paused_remaining_seconds = frozen;
        self.persist_state();
    }

    fn stop(&mut self) {
        self.state.is_stopped = true;
        self.state.is_paused = false;
        self.state.paused_at = None;
        self.persist_state();
    }

    fn reset(&mut self) {
        self.config.start_time = self.config.initial_start_time;
        self.state.total_added_seconds = 0;
        self.state.event_log.clear();
        self.state.is_stopped = false;
        self.state.is_paused = false;
        self.state.paused_at = None;
        self.state.total_paused_seconds = 0;

        // Re-enter paused: ready but not started, displaying the freshly
        // re-anchored countdown.
        let frozen = self.current_snapshot().remaining_at(Utc::now()).num_seconds();
        self.state.is_paused = true;
        self.state.paused_remaining_seconds = frozen;

        tracing::info!(tenant_id = %self.tenant_id, "Timer reset");
        self.persist_config();
        self.persist_state();
    }

    fn update_config(&mut self, config: TimerConfig) {
        self.config = config;
        self.persist_config();
    }

    fn replay_emergency(&mut self) {
        match self.emergency.recover() {
            Ok(summary) => {
                if summary.recovered.is_empty() && summary.malformed_lines == 0 {
                    return;
                }
                tracing::info!(
                    tenant_id = %self.tenant_id,
                    recovered = summary.recovered.len(),
                    malformed = summary.malformed_lines,
                    archived = ?summary.archived_to,
                    "Replaying emergency log"
                );
                for event in summary.recovered {
                    // Dedup on message id makes replay duplication safe.
                    let _ = self.resubmit_tx.send(Command::Apply(event));
                }
            }
            Err(e) => {
                tracing::error!(tenant_id = %self.tenant_id, error = %e, "Emergency log recovery failed");
            }
        }
    }

    fn current_snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            config: self.config.clone(),
            state: self.state.clone(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.current_snapshot());
    }

    fn persist_state(&self) {
        if let Err(e) = self.store.save_state(&self.state) {
            // Applied state stays authoritative in memory; disk is behind
            // until the next successful snapshot.
            tracing::error!(
                tenant_id = %self.tenant_id,
                error = %e,
                "Failed to persist state snapshot"
            );
        }
    }

    fn persist_config(&self) {
        if let Err(e) = self.store.save_config(&self.config) {
            tracing::error!(
                tenant_id = %self.tenant_id,
                error = %e,
                "Failed to persist config snapshot"
            );
        }
    }
}
