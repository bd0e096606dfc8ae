//! Pacing arithmetic: spreading a wall-clock budget across work units.

use std::time::Duration;

pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Share of `total_hours` allotted to each of `step_count` units.
///
/// Zero when pacing is off (`total_hours <= 0`, not finite) or there is
/// nothing to pace.
pub fn step_budget(total_hours: f64, step_count: usize) -> Duration {
    if step_count == 0 || !total_hours.is_finite() || total_hours <= 0.0 {
        return Duration::ZERO;
    }
    let secs = total_hours * SECONDS_PER_HOUR / step_count as f64;
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// How long to wait after a unit that took `elapsed` of its `budget`.
///
/// Never negative: a slow unit yields zero and does not borrow from later
/// units.
pub fn remaining_wait(budget: Duration, elapsed: Duration) -> Duration {
    budget.saturating_sub(elapsed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_hours_over_four_units() {
        assert_eq!(step_budget(2.0, 4), Duration::from_secs(1800));
    }

    #[test]
    fn budget_times_steps_equals_total() {
        for (hours, steps) in [(0.5, 7usize), (3.25, 113), (48.0, 1), (0.01, 9)] {
            let total = step_budget(hours, steps).as_secs_f64() * steps as f64;
            assert!(
                (total - hours * SECONDS_PER_HOUR).abs() < 1e-6,
                "{hours}h over {steps} steps gave {total}s"
            );
        }
    }

    #[test]
    fn non_positive_hours_disable_pacing() {
        assert_eq!(step_budget(0.0, 10), Duration::ZERO);
        assert_eq!(step_budget(-1.5, 10), Duration::ZERO);
        assert_eq!(step_budget(f64::NAN, 10), Duration::ZERO);
    }

    #[test]
    fn zero_steps_disable_pacing() {
        assert_eq!(step_budget(4.0, 0), Duration::ZERO);
    }

    #[test]
    fn remainder_after_fast_unit() {
        let wait = remaining_wait(Duration::from_secs(1800), Duration::from_secs(300));
        assert_eq!(wait, Duration::from_secs(1500));
    }

    #[test]
    fn slow_unit_waits_nothing() {
        let wait = remaining_wait(Duration::from_secs(60), Duration::from_secs(600));
        assert_eq!(wait, Duration::ZERO);
    }
}
