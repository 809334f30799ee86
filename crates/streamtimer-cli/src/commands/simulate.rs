use clap::Subcommand;

use crate::common::{with_timer, CliResult};

/// Rehearsal events: exercise the reward pipeline without a live
/// platform connection. They take the exact same path as real
/// notifications, dedup ids included.
#[derive(Subcommand)]
pub enum SimulateAction {
    /// Simulate a subscription (or gift subscription)
    Sub {
        tenant: String,
        #[arg(long, default_value = "1000")]
        tier: String,
        #[arg(long)]
        gift: bool,
        #[arg(long, default_value_t = 1)]
        count: i64,
        #[arg(long, default_value = "TestViewer")]
        user: String,
    },
    /// Simulate a cheer
    Bits {
        tenant: String,
        bits: i64,
        #[arg(long, default_value_t = 1)]
        count: i64,
        #[arg(long, default_value = "TestViewer")]
        user: String,
    },
}

pub fn run(action: SimulateAction) -> CliResult {
    match action {
        SimulateAction::Sub {
            tenant,
            tier,
            gift,
            count,
            user,
        } => with_timer(&tenant, |timer| {
            timer.enqueue_sub(&user, &tier, gift, count);
            let kind = if gift { "gift sub" } else { "sub" };
            println!("Simulated {count}x {kind} (tier {tier}) by {user} for {tenant}");
            Ok(())
        }),
        SimulateAction::Bits {
            tenant,
            bits,
            count,
            user,
        } => with_timer(&tenant, |timer| {
            timer.enqueue_bits(&user, bits, count);
            println!("Simulated {count}x cheer of {bits} bits by {user} for {tenant}");
            Ok(())
        }),
    }
}
