pub mod accumulator;
pub mod config;
pub mod event;
pub mod registry;
pub mod reward;
pub mod state;

pub use accumulator::{Accumulator, TimerHandle, RECOVERY_SCAN_INTERVAL};
pub use config::TimerConfig;
pub use event::{ProcessedEvent, TimerEvent};
pub use registry::TimerRegistry;
pub use reward::Reward;
pub use state::{TimerSnapshot, TimerState};
