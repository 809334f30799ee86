use clap::Subcommand;

use crate::common::{with_timer, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the full config document
    Show { tenant: String },
    /// Get a single config value by field name
    Get { tenant: String, key: String },
    /// Set a single config value by field name
    Set {
        tenant: String,
        key: String,
        value: String,
    },
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Show { tenant } => with_timer(&tenant, |timer| {
            let config = timer.snapshot().config;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }),
        ConfigAction::Get { tenant, key } => with_timer(&tenant, |timer| {
            match timer.snapshot().config.get(&key) {
                Some(value) => {
                    println!("{value}");
                    Ok(())
                }
                None => Err(format!("unknown config key: {key}").into()),
            }
        }),
        ConfigAction::Set { tenant, key, value } => with_timer(&tenant, |timer| {
            let updated = timer.snapshot().config.with_value(&key, &value)?;
            timer.update_config(updated)?;
            println!("Set {key} = {value} for {tenant}");
            Ok(())
        }),
    }
}
