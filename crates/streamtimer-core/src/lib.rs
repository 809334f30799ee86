//! # Streamtimer Core Library
//!
//! Core business logic for Streamtimer, a viewer-extendable countdown for
//! live streams: subscriptions, gifted subs, and bit donations add time to
//! a single deadline, and the accumulator makes sure no committed reward is
//! lost to a crash or a duplicated delivery.
//!
//! ## Architecture
//!
//! - **Accumulator**: one single-consumer state machine per tenant; every
//!   mutation travels as a typed command over one channel
//! - **Reward calculus**: pure per-event-type mapping from config to seconds
//! - **Storage**: whole-document JSON snapshots plus an append-only
//!   emergency log for events that miss the primary queue
//! - **Registry**: lazy per-tenant accumulator creation and disposal
//! - **Integrations**: the Twitch boundary (OAuth, token validation,
//!   EventSub webhook signatures)
//!
//! ## Key Components
//!
//! - [`TimerRegistry`]: tenant id -> running accumulator
//! - [`TimerHandle`]: cloneable producer/reader API for one tenant
//! - [`TimerConfig`] / [`TimerState`]: the two persisted documents
//! - [`TimerSnapshot`]: the derived remaining-time projection

pub mod error;
pub mod integrations;
pub mod storage;
pub mod timer;

pub use error::{AuthError, CoreError, Result, StorageError};
pub use storage::{data_dir, EmergencyLog, TenantStore};
pub use timer::{
    ProcessedEvent, TimerConfig, TimerEvent, TimerHandle, TimerRegistry, TimerSnapshot, TimerState,
};
