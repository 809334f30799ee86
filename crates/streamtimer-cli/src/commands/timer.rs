use clap::Subcommand;

use crate::common::{format_duration, with_timer, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start (or resume) the countdown
    Start { tenant: String },
    /// Pause the countdown, freezing the displayed remaining time
    Pause { tenant: String },
    /// Stop the countdown entirely
    Stop { tenant: String },
    /// Restore the initial anchor and clear all accumulated time
    Reset { tenant: String },
    /// Show the current countdown state
    Status {
        tenant: String,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: TimerAction) -> CliResult {
    match action {
        TimerAction::Start { tenant } => with_timer(&tenant, |timer| {
            timer.start()?;
            println!("Timer started for {tenant}");
            Ok(())
        }),
        TimerAction::Pause { tenant } => with_timer(&tenant, |timer| {
            timer.pause()?;
            println!("Timer paused for {tenant}");
            Ok(())
        }),
        TimerAction::Stop { tenant } => with_timer(&tenant, |timer| {
            timer.stop()?;
            println!("Timer stopped for {tenant}");
            Ok(())
        }),
        TimerAction::Reset { tenant } => with_timer(&tenant, |timer| {
            timer.reset()?;
            println!("Timer reset for {tenant}");
            Ok(())
        }),
        TimerAction::Status { tenant, json } => with_timer(&tenant, |timer| {
            let snapshot = timer.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }
            let state = if snapshot.state.is_stopped {
                "stopped"
            } else if snapshot.state.is_paused {
                "paused"
            } else if timer.is_running() {
                "running"
            } else {
                "expired"
            };
            println!("Tenant:      {tenant}");
            println!("State:       {state}");
            println!("Remaining:   {}", format_duration(timer.remaining_time()));
            println!("Added:       {}s", snapshot.state.total_added_seconds);
            println!("Events:      {}", snapshot.state.event_log.len());
            Ok(())
        }),
    }
}
