//! Reward calculus.
//!
//! Pure mapping from (event, config) to seconds-to-add plus a log
//! description. No state, no clock, no I/O; the accumulator decides what to
//! do with the result.
//!
//! Tier handling is deliberately asymmetric: an unrecognized tier on an
//! ordinary sub falls back to the tier-1 rate, while an unrecognized tier on
//! a gift sub earns nothing.

use super::config::TimerConfig;
use super::event::TimerEvent;

/// Outcome of the reward calculation for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Reward {
    pub seconds: i64,
    pub description: String,
}

/// Compute the reward for `event` under `config`.
pub fn calculate(event: &TimerEvent, config: &TimerConfig) -> Reward {
    match event {
        TimerEvent::Sub {
            user_display,
            tier,
            count,
            ..
        } => {
            let rate = match tier.as_str() {
                "1000" => config.seconds_per_sub_tier1,
                "2000" => config.seconds_per_sub_tier2,
                "3000" => config.seconds_per_sub_tier3,
                "Prime" => config.seconds_per_prime_sub,
                _ => config.seconds_per_sub_tier1,
            };
            Reward {
                seconds: rate * count,
                description: if *count > 1 {
                    format!("{count}x Sub ({tier}) by {user_display}")
                } else {
                    format!("Sub ({tier}) by {user_display}")
                },
            }
        }

        TimerEvent::GiftSub {
            user_display,
            tier,
            count,
            ..
        } => {
            let rate = match tier.as_str() {
                "1000" => config.seconds_per_sub_tier1,
                "2000" => config.seconds_per_sub_tier2,
                "3000" => config.seconds_per_sub_tier3,
                _ => 0,
            };
            Reward {
                seconds: rate * count,
                description: if *count > 1 {
                    format!("{count}x Gift Sub ({tier}) to {user_display}")
                } else {
                    format!("Gift Sub ({tier}) to {user_display}")
                },
            }
        }

        TimerEvent::Bits {
            user_display,
            bits,
            count,
            ..
        } => {
            let total_bits = bits * count;
            let seconds = if total_bits < config.min_bits_to_trigger {
                0
            } else if config.seconds_per_bit > 0 {
                total_bits * config.seconds_per_bit
            } else if config.seconds_per_bits > 0 && config.min_bits_to_trigger > 0 {
                // Block mode: full blocks only, partial blocks earn nothing.
                (total_bits / config.min_bits_to_trigger) * config.seconds_per_bits
            } else {
                0
            };
            Reward {
                seconds,
                description: if *count > 1 {
                    format!("{count}x Cheer {bits} bits ({total_bits} total) by {user_display}")
                } else {
                    format!("Cheer {bits} bits by {user_display}")
                },
            }
        }

        TimerEvent::Manual { seconds, reason } => Reward {
            seconds: *seconds,
            description: reason.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> TimerConfig {
        TimerConfig {
            seconds_per_sub_tier1: 60,
            seconds_per_sub_tier2: 120,
            seconds_per_sub_tier3: 180,
            seconds_per_prime_sub: 90,
            seconds_per_bit: 0,
            seconds_per_bits: 60,
            min_bits_to_trigger: 100,
            ..TimerConfig::default()
        }
    }

    fn sub(tier: &str, count: i64) -> TimerEvent {
        TimerEvent::Sub {
            message_id: "sub-t-1".into(),
            user_display: "Viewer".into(),
            tier: tier.into(),
            count,
        }
    }

    fn gift(tier: &str, count: i64) -> TimerEvent {
        TimerEvent::GiftSub {
            message_id: "sub-t-2".into(),
            user_display: "Lucky".into(),
            tier: tier.into(),
            count,
        }
    }

    fn bits(bits: i64, count: i64) -> TimerEvent {
        TimerEvent::Bits {
            message_id: "bits-t-3".into(),
            user_display: "Cheerer".into(),
            bits,
            count,
        }
    }

    #[test]
    fn sub_tier_table() {
        let cfg = config();
        assert_eq!(calculate(&sub("1000", 1), &cfg).seconds, 60);
        assert_eq!(calculate(&sub("2000", 1), &cfg).seconds, 120);
        assert_eq!(calculate(&sub("3000", 1), &cfg).seconds, 180);
        assert_eq!(calculate(&sub("Prime", 1), &cfg).seconds, 90);
    }

    #[test]
    fn unknown_tier_falls_back_for_subs_but_not_gifts() {
        let cfg = config();
        assert_eq!(calculate(&sub("9000", 1), &cfg).seconds, 60);
        assert_eq!(calculate(&gift("9000", 1), &cfg).seconds, 0);
        // "Prime" is not a gift tier either.
        assert_eq!(calculate(&gift("Prime", 1), &cfg).seconds, 0);
    }

    #[test]
    fn bits_block_mode() {
        let cfg = config();
        assert_eq!(calculate(&bits(200, 1), &cfg).seconds, 120);
        assert_eq!(calculate(&bits(150, 1), &cfg).seconds, 60);
        assert_eq!(calculate(&bits(99, 1), &cfg).seconds, 0);
    }

    #[test]
    fn bits_linear_mode_takes_precedence() {
        let cfg = TimerConfig {
            seconds_per_bit: 2,
            ..config()
        };
        assert_eq!(calculate(&bits(150, 1), &cfg).seconds, 300);
        // The threshold still gates linear mode.
        assert_eq!(calculate(&bits(99, 1), &cfg).seconds, 0);
    }

    #[test]
    fn bits_count_multiplies_before_threshold() {
        let cfg = config();
        // 60 * 2 = 120 total bits, one full block.
        assert_eq!(calculate(&bits(60, 2), &cfg).seconds, 60);
    }

    #[test]
    fn manual_passes_signed_seconds_verbatim() {
        let cfg = config();
        let add = TimerEvent::Manual {
            seconds: 500,
            reason: "stream extension".into(),
        };
        let reward = calculate(&add, &cfg);
        assert_eq!(reward.seconds, 500);
        assert_eq!(reward.description, "stream extension");

        let sub = TimerEvent::Manual {
            seconds: -120,
            reason: "correction".into(),
        };
        assert_eq!(calculate(&sub, &cfg).seconds, -120);
    }

    #[test]
    fn descriptions_pluralize() {
        let cfg = config();
        assert_eq!(
            calculate(&sub("1000", 3), &cfg).description,
            "3x Sub (1000) by Viewer"
        );
        assert_eq!(
            calculate(&gift("2000", 1), &cfg).description,
            "Gift Sub (2000) to Lucky"
        );
        assert_eq!(
            calculate(&bits(300, 2), &cfg).description,
            "2x Cheer 300 bits (600 total) by Cheerer"
        );
        assert_eq!(
            calculate(&bits(500, 1), &cfg).description,
            "Cheer 500 bits by Cheerer"
        );
    }

    proptest! {
        #[test]
        fn sub_reward_scales_linearly(count in 1i64..10_000) {
            let cfg = config();
            prop_assert_eq!(calculate(&sub("2000", count), &cfg).seconds, 120 * count);
        }

        #[test]
        fn block_mode_never_exceeds_linear_bound(total in 0i64..1_000_000) {
            let cfg = config();
            let reward = calculate(&bits(total, 1), &cfg).seconds;
            // Full blocks only: never more than total/threshold blocks,
            // and exactly zero below the threshold.
            prop_assert!(reward <= (total / cfg.min_bits_to_trigger) * cfg.seconds_per_bits);
            if total < cfg.min_bits_to_trigger {
                prop_assert_eq!(reward, 0);
            }
        }
    }
}
