//! Timer event types.
//!
//! [`TimerEvent`] is the transient ingestion record: one variant per reward
//! kind, carrying only that kind's fields. It is serialized as one JSON line
//! when it has to take the emergency-log detour, so the representation is
//! internally tagged and stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription tier strings as the platform reports them.
///
/// Tiers stay strings on purpose: unrecognized tiers must flow through to
/// the reward calculator, which treats them differently for subs and gifts.
pub const KNOWN_TIERS: [&str; 4] = ["1000", "2000", "3000", "Prime"];

/// A reward-bearing event on its way to the accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    Sub {
        message_id: String,
        user_display: String,
        tier: String,
        count: i64,
    },
    GiftSub {
        message_id: String,
        user_display: String,
        tier: String,
        count: i64,
    },
    Bits {
        message_id: String,
        user_display: String,
        bits: i64,
        count: i64,
    },
    Manual {
        seconds: i64,
        reason: String,
    },
}

impl TimerEvent {
    /// The deduplication id, if this event kind carries one.
    ///
    /// Manual events have no id and are never deduplicated.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            TimerEvent::Sub { message_id, .. }
            | TimerEvent::GiftSub { message_id, .. }
            | TimerEvent::Bits { message_id, .. } => Some(message_id),
            TimerEvent::Manual { .. } => None,
        }
    }

    /// The viewer display name attached to the event, if any.
    pub fn user_display(&self) -> Option<&str> {
        match self {
            TimerEvent::Sub { user_display, .. }
            | TimerEvent::GiftSub { user_display, .. }
            | TimerEvent::Bits { user_display, .. } => Some(user_display),
            TimerEvent::Manual { .. } => None,
        }
    }
}

/// Synthesize a deterministic message id for an externally-triggered event:
/// `{kind}-{tenant_id}-{nanosecond timestamp}`.
pub fn synth_message_id(kind: &str, tenant_id: &str) -> String {
    let ts = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{kind}-{tenant_id}-{ts}")
}

/// An applied event in the accumulator's bounded log.
///
/// Append-once; the only mutation is whole-record removal via delete, which
/// reverses exactly `seconds_added`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub seconds_added: i64,
    #[serde(default)]
    pub user_display: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_present_only_for_platform_events() {
        let sub = TimerEvent::Sub {
            message_id: "sub-t1-1".into(),
            user_display: "Viewer".into(),
            tier: "1000".into(),
            count: 1,
        };
        assert_eq!(sub.message_id(), Some("sub-t1-1"));

        let manual = TimerEvent::Manual {
            seconds: 60,
            reason: "extension".into(),
        };
        assert_eq!(manual.message_id(), None);
        assert_eq!(manual.user_display(), None);
    }

    #[test]
    fn synth_ids_carry_kind_and_tenant() {
        let id = synth_message_id("bits", "tenant42");
        assert!(id.starts_with("bits-tenant42-"));
    }

    #[test]
    fn event_lines_are_tagged() {
        let evt = TimerEvent::Bits {
            message_id: "bits-t1-7".into(),
            user_display: "Cheerer".into(),
            bits: 500,
            count: 1,
        };
        let line = serde_json::to_string(&evt).unwrap();
        assert!(line.contains(r#""type":"bits""#));
        let back: TimerEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(back, evt);
    }
}
