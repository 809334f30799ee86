//! Per-tenant timer configuration.
//!
//! Stores the countdown anchors, duration bounds, and the reward rates the
//! calculator reads. Replaced wholesale on update; persisted as
//! `timer_config.json` in the tenant's data directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for one tenant's countdown timer.
///
/// `max_duration_seconds == 0` means uncapped. `max >= min` is expected but
/// not enforced here; the caller owns that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Countdown anchor. Rewritten by reset from `initial_start_time`.
    #[serde(default = "Utc::now")]
    pub start_time: DateTime<Utc>,
    /// Immutable anchor used by reset.
    #[serde(default = "Utc::now")]
    pub initial_start_time: DateTime<Utc>,

    #[serde(default = "default_min_duration")]
    pub min_duration_seconds: i64,
    /// 0 = uncapped.
    #[serde(default = "default_max_duration")]
    pub max_duration_seconds: i64,

    #[serde(default = "default_tier1_seconds")]
    pub seconds_per_sub_tier1: i64,
    #[serde(default = "default_tier2_seconds")]
    pub seconds_per_sub_tier2: i64,
    #[serde(default = "default_tier3_seconds")]
    pub seconds_per_sub_tier3: i64,
    #[serde(default = "default_tier1_seconds")]
    pub seconds_per_prime_sub: i64,

    /// Linear bits mode: seconds per single bit. 0 disables linear mode and
    /// selects block mode via `seconds_per_bits`.
    #[serde(default)]
    pub seconds_per_bit: i64,
    /// Block bits mode: seconds per full `min_bits_to_trigger` block.
    #[serde(default = "default_seconds_per_bits")]
    pub seconds_per_bits: i64,
    /// Bits below this threshold never trigger a reward.
    #[serde(default = "default_min_bits")]
    pub min_bits_to_trigger: i64,

    // Overlay cosmetics, not load-bearing for the accumulator.
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
}

fn default_min_duration() -> i64 {
    86_400 // 24 hours
}
fn default_max_duration() -> i64 {
    7_776_000 // 90 days
}
fn default_tier1_seconds() -> i64 {
    60
}
fn default_tier2_seconds() -> i64 {
    120
}
fn default_tier3_seconds() -> i64 {
    180
}
fn default_seconds_per_bits() -> i64 {
    60
}
fn default_min_bits() -> i64 {
    1000
}
fn default_background_color() -> String {
    "#1e1e1e".into()
}
fn default_text_color() -> String {
    "#00e676".into()
}

impl Default for TimerConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            initial_start_time: now,
            min_duration_seconds: default_min_duration(),
            max_duration_seconds: default_max_duration(),
            seconds_per_sub_tier1: default_tier1_seconds(),
            seconds_per_sub_tier2: default_tier2_seconds(),
            seconds_per_sub_tier3: default_tier3_seconds(),
            seconds_per_prime_sub: default_tier1_seconds(),
            seconds_per_bit: 0,
            seconds_per_bits: default_seconds_per_bits(),
            min_bits_to_trigger: default_min_bits(),
            background_color: default_background_color(),
            text_color: default_text_color(),
        }
    }
}

impl TimerConfig {
    /// Get a config value as string by field name.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match json.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by field name, parsing `value` to the field's
    /// existing JSON type. Returns the updated config without persisting it;
    /// persistence goes through the accumulator's update-config command.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// as the field's type.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut json = serde_json::to_value(self)?;
        let obj = json
            .as_object_mut()
            .ok_or("config did not serialize to an object")?;
        let existing = obj
            .get(key)
            .ok_or_else(|| format!("unknown config key: {key}"))?;

        let new_value = match existing {
            serde_json::Value::Number(_) => {
                let n = value
                    .parse::<i64>()
                    .map_err(|_| format!("cannot parse '{value}' as integer"))?;
                serde_json::Value::Number(n.into())
            }
            serde_json::Value::String(_) if is_instant_field(key) => {
                // Keep timestamp fields round-trippable through chrono.
                let parsed: DateTime<Utc> = value
                    .parse()
                    .map_err(|_| format!("cannot parse '{value}' as RFC 3339 instant"))?;
                serde_json::to_value(parsed)?
            }
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(key.to_string(), new_value);
        Ok(serde_json::from_value(json)?)
    }
}

fn is_instant_field(key: &str) -> bool {
    matches!(key, "start_time" | "initial_start_time")
}
