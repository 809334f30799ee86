//! Shared helpers for CLI commands.
//!
//! Every command is a one-shot process: build a small runtime, open the
//! tenant's accumulator (which replays any stranded emergency events as a
//! side effect), run the operation, then settle and flush before exiting.

use std::error::Error;
use std::future::Future;

use streamtimer_core::{TimerHandle, TimerRegistry};

pub type CliResult = Result<(), Box<dyn Error>>;

/// Run a future to completion on a current-thread runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

/// Open a tenant's timer, run `op` against it, then flush and shut down so
/// every mutation is on disk before the process exits.
pub fn with_timer<F, T>(tenant_id: &str, op: F) -> Result<T, Box<dyn Error>>
where
    F: FnOnce(&TimerHandle) -> Result<T, Box<dyn Error>>,
{
    block_on(async {
        let registry = TimerRegistry::new()?;
        let timer = registry.timer(tenant_id)?;
        // Let startup recovery settle before the operation looks around.
        timer.flush().await?;
        let result = op(&timer);
        registry.shutdown_all().await;
        result
    })?
}

/// Render a chrono duration as `HH:MM:SS` (days folded into hours).
pub fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_folds_days_into_hours() {
        assert_eq!(format_duration(chrono::Duration::seconds(0)), "00:00:00");
        assert_eq!(format_duration(chrono::Duration::seconds(61)), "00:01:01");
        assert_eq!(
            format_duration(chrono::Duration::seconds(26 * 3600 + 90)),
            "26:01:30"
        );
        // Negative durations clamp to zero for display.
        assert_eq!(format_duration(chrono::Duration::seconds(-5)), "00:00:00");
    }
}
