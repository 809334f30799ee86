use clap::Subcommand;

use crate::common::{with_timer, CliResult};

#[derive(Subcommand)]
pub enum EventAction {
    /// Add a signed manual time adjustment
    Add {
        tenant: String,
        /// Seconds to add (negative subtracts)
        seconds: i64,
        /// Reason shown in the event log
        #[arg(default_value = "manual adjustment")]
        reason: String,
    },
    /// List processed events, newest last
    List {
        tenant: String,
        #[arg(long)]
        json: bool,
        /// Show at most this many of the newest events
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Delete a processed event and reverse its time contribution
    Delete { tenant: String, event_id: String },
}

pub fn run(action: EventAction) -> CliResult {
    match action {
        EventAction::Add {
            tenant,
            seconds,
            reason,
        } => with_timer(&tenant, |timer| {
            timer.add_manual_time(seconds, &reason);
            println!("Queued {seconds}s adjustment for {tenant}: {reason}");
            Ok(())
        }),
        EventAction::List {
            tenant,
            json,
            limit,
        } => with_timer(&tenant, |timer| {
            let log = timer.snapshot().state.event_log;
            let shown = log.len().saturating_sub(limit);
            let events = &log[shown..];
            if json {
                println!("{}", serde_json::to_string_pretty(events)?);
                return Ok(());
            }
            if events.is_empty() {
                println!("No events for {tenant}");
                return Ok(());
            }
            for event in events {
                println!(
                    "{}  {:>8}s  {}  [{}]",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.seconds_added,
                    event.description,
                    event.id,
                );
            }
            if shown > 0 {
                println!("({shown} older events not shown)");
            }
            Ok(())
        }),
        EventAction::Delete { tenant, event_id } => with_timer(&tenant, |timer| {
            timer.delete_event(&event_id)?;
            println!("Deleted event {event_id} for {tenant}");
            Ok(())
        }),
    }
}
