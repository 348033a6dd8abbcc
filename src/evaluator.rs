//! Schedule evaluator: pure decision function for device power transitions.
//!
//! The sweep jobs run on an hourly cadence, so matching is by hour only;
//! a schedule's minutes are ignored and the transition fires on the tick
//! that lands inside the configured hour.

use chrono::{NaiveTime, Timelike};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoAction,
    PowerOff,
    PowerOn,
}

/// Decide whether a device is due for a power transition.
///
/// A device that is not mid-cycle powers off when the current hour matches
/// its configured off time. A device that is mid-cycle powers back on when
/// the current hour matches its configured on time. The mid-cycle flag is
/// the idempotence guard: repeated ticks within the same hour see the
/// flipped flag and return `NoAction`.
pub fn evaluate(
    now: NaiveTime,
    power_on_time: NaiveTime,
    power_off_time: NaiveTime,
    mid_cycle: bool,
) -> Transition {
    if mid_cycle {
        if now.hour() == power_on_time.hour() {
            return Transition::PowerOn;
        }
    } else if now.hour() == power_off_time.hour() {
        return Transition::PowerOff;
    }
    Transition::NoAction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_power_off_fires_at_off_hour() {
        let decision = evaluate(t(22, 0), t(6, 0), t(22, 0), false);
        assert_eq!(decision, Transition::PowerOff);
    }

    #[test]
    fn test_power_on_fires_at_on_hour_when_mid_cycle() {
        let decision = evaluate(t(6, 0), t(6, 0), t(22, 0), true);
        assert_eq!(decision, Transition::PowerOn);
    }

    #[test]
    fn test_no_action_outside_scheduled_hours() {
        assert_eq!(evaluate(t(14, 0), t(6, 0), t(22, 0), false), Transition::NoAction);
        assert_eq!(evaluate(t(14, 0), t(6, 0), t(22, 0), true), Transition::NoAction);
    }

    #[test]
    fn test_mid_cycle_guard_blocks_double_power_off() {
        // Second tick in the same hour: the flag has flipped, nothing fires
        assert_eq!(evaluate(t(22, 30), t(6, 0), t(22, 0), true), Transition::NoAction);
    }

    #[test]
    fn test_cleared_flag_blocks_double_power_on() {
        assert_eq!(evaluate(t(6, 30), t(6, 0), t(22, 0), false), Transition::NoAction);
    }

    #[test]
    fn test_minutes_are_ignored() {
        // Schedule says 22:45 but the tick at 22:00 still matches the hour
        assert_eq!(evaluate(t(22, 0), t(6, 15), t(22, 45), false), Transition::PowerOff);
        assert_eq!(evaluate(t(6, 59), t(6, 15), t(22, 45), true), Transition::PowerOn);
    }

    #[test]
    fn test_midnight_crossing_span() {
        // Off at 22:00, on at 06:00 the next day: each boundary evaluated
        // independently, the elapsed duration comes from the stored timestamp
        assert_eq!(evaluate(t(22, 0), t(6, 0), t(22, 0), false), Transition::PowerOff);
        assert_eq!(evaluate(t(0, 0), t(6, 0), t(22, 0), true), Transition::NoAction);
        assert_eq!(evaluate(t(6, 0), t(6, 0), t(22, 0), true), Transition::PowerOn);
    }

    #[test]
    fn test_same_hour_on_and_off() {
        // Degenerate config: both boundaries in the same hour. The flag
        // decides which transition applies, never both for one state. With
        // the on-sweep staggered behind the off-sweep, such a device cycles
        // within the hour and logs the short true elapsed duration.
        assert_eq!(evaluate(t(8, 0), t(8, 0), t(8, 0), false), Transition::PowerOff);
        assert_eq!(evaluate(t(8, 0), t(8, 0), t(8, 0), true), Transition::PowerOn);
    }

    #[test]
    fn test_deterministic() {
        for _ in 0..5 {
            assert_eq!(evaluate(t(22, 0), t(6, 0), t(22, 0), false), Transition::PowerOff);
        }
    }
}
