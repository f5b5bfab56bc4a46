use crate::item::Item;
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Lowest quality on the SM-2 scale
pub const MIN_QUALITY: f64 = 0.0;
/// Highest quality on the SM-2 scale
pub const MAX_QUALITY: f64 = 5.0;

/// Tunable SM-2 constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerParams {
    /// Floor for the easiness factor (default: 1.3)
    #[serde(default = "default_min_easiness_factor")]
    pub min_easiness_factor: f64,

    /// Interval after the first passing evaluation in a streak (default: 1)
    #[serde(default = "default_first_interval")]
    pub first_interval_days: i64,

    /// Interval after the second passing evaluation in a streak (default: 6)
    #[serde(default = "default_second_interval")]
    pub second_interval_days: i64,

    /// Lowest quality that counts as a pass (default: 3.0)
    #[serde(default = "default_passing_quality")]
    pub passing_quality: f64,

    /// Longest interval between reviews in days (default: 3650)
    #[serde(default = "default_max_interval_days")]
    pub max_interval_days: i64,
}

fn default_min_easiness_factor() -> f64 {
    1.3
}

fn default_first_interval() -> i64 {
    1
}

fn default_second_interval() -> i64 {
    6
}

fn default_passing_quality() -> f64 {
    3.0
}

fn default_max_interval_days() -> i64 {
    3650
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            min_easiness_factor: default_min_easiness_factor(),
            first_interval_days: default_first_interval(),
            second_interval_days: default_second_interval(),
            passing_quality: default_passing_quality(),
            max_interval_days: default_max_interval_days(),
        }
    }
}

/// Clamp a raw evaluation into the SM-2 quality range. NaN counts as a blackout.
pub fn clamp_quality(evaluation: f64) -> f64 {
    if evaluation.is_nan() {
        MIN_QUALITY
    } else {
        evaluation.clamp(MIN_QUALITY, MAX_QUALITY)
    }
}

pub fn is_valid_quality(evaluation: f64) -> bool {
    (MIN_QUALITY..=MAX_QUALITY).contains(&evaluation)
}

/// SM-2 scheduler
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    params: SchedulerParams,
}

impl Scheduler {
    pub fn new(params: SchedulerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    /// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored
    pub fn next_easiness_factor(&self, easiness_factor: f64, quality: f64) -> f64 {
        let miss = MAX_QUALITY - quality;
        let delta = 0.1 - miss * (0.08 + miss * 0.02);
        (easiness_factor + delta).max(self.params.min_easiness_factor)
    }

    /// Interval in days for the given position in a passing streak,
    /// between 1 and `max_interval_days`
    pub fn interval_days(&self, streak: u32, previous_days: i64, easiness_factor: f64) -> i64 {
        let days = match streak {
            0 | 1 => self.params.first_interval_days,
            2 => self.params.second_interval_days,
            // f64 -> i64 casts saturate
            _ => (previous_days as f64 * easiness_factor).round() as i64,
        };
        days.clamp(1, self.params.max_interval_days.max(1))
    }

    /// Compute the item's state after an evaluation made at `now`.
    /// Out-of-range evaluations are clamped; this never fails.
    pub fn schedule(&self, item: &Item, evaluation: f64, now: i64) -> Item {
        let quality = clamp_quality(evaluation);
        let mut next = item.clone();

        next.easiness_factor = self.next_easiness_factor(item.easiness_factor, quality);

        if quality < self.params.passing_quality {
            // Failed: back to the start of the streak, shown again this session
            next.actual_times_repeated = 0;
            next.extra_repeat_today = true;
            next.previous_days_change = 0;
            next.next_repetition = now;
        } else {
            // A never-scheduled item starts its streak from zero
            let streak = if item.is_new() {
                1
            } else {
                item.actual_times_repeated.saturating_add(1)
            };
            let interval = self.interval_days(streak, item.previous_days_change, next.easiness_factor);

            next.actual_times_repeated = streak;
            next.extra_repeat_today = false;
            next.previous_days_change = interval;
            next.next_repetition = now.saturating_add(interval.saturating_mul(SECONDS_PER_DAY));
        }

        next.times_repeated = item.times_repeated.saturating_add(1);
        next.last_repetition = now;
        next
    }
}

/// Schedule with the standard SM-2 constants
pub fn schedule_next_review(item: &Item, evaluation: f64, now: i64) -> Item {
    Scheduler::default().schedule(item, evaluation, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn item() -> Item {
        Item::with_id("item-1", "user-1", "card-1")
    }

    fn scheduled(streak: u32, previous_days: i64) -> Item {
        Item {
            actual_times_repeated: streak,
            previous_days_change: previous_days,
            last_repetition: NOW - previous_days * SECONDS_PER_DAY,
            next_repetition: NOW,
            times_repeated: streak,
            ..item()
        }
    }

    #[test]
    fn test_first_pass_on_new_item() {
        let next = schedule_next_review(&item(), 4.0, NOW);
        assert_eq!(next.actual_times_repeated, 1);
        assert_eq!(next.previous_days_change, 1);
        assert_eq!(next.next_repetition, NOW + SECONDS_PER_DAY);
        assert_eq!(next.last_repetition, NOW);
        assert_eq!(next.times_repeated, 1);
        assert!((next.easiness_factor - 2.5).abs() < 1e-9);
        assert!(!next.extra_repeat_today);
    }

    #[test]
    fn test_second_pass_uses_six_days() {
        let next = schedule_next_review(&scheduled(1, 1), 4.0, NOW);
        assert_eq!(next.actual_times_repeated, 2);
        assert_eq!(next.previous_days_change, 6);
        assert_eq!(next.next_repetition, NOW + 6 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_later_pass_multiplies_by_easiness() {
        // EF 2.5 + 0.1 = 2.6, 6 * 2.6 = 15.6
        let next = schedule_next_review(&scheduled(2, 6), 5.0, NOW);
        assert_eq!(next.actual_times_repeated, 3);
        assert_eq!(next.previous_days_change, 16);
        assert!((next.easiness_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_failing_grade_resets_streak() {
        let next = schedule_next_review(&scheduled(1, 1), 2.0, NOW);
        assert_eq!(next.actual_times_repeated, 0);
        assert!(next.extra_repeat_today);
        assert_eq!(next.next_repetition, NOW);
        assert_eq!(next.previous_days_change, 0);
        assert_eq!(next.times_repeated, 2);
        assert!((next.easiness_factor - 2.18).abs() < 1e-9);
    }

    #[test]
    fn test_extra_repeat_cleared_by_pass() {
        let failed = schedule_next_review(&scheduled(3, 15), 1.0, NOW);
        assert!(failed.extra_repeat_today);

        let passed = schedule_next_review(&failed, 3.0, NOW + 60);
        assert!(!passed.extra_repeat_today);
        assert_eq!(passed.actual_times_repeated, 1);
        assert_eq!(passed.previous_days_change, 1);
    }

    #[test]
    fn test_easiness_floor() {
        let mut state = item();
        for _ in 0..20 {
            state = schedule_next_review(&state, 0.0, NOW);
            assert!(state.easiness_factor >= 1.3);
        }
        assert!((state.easiness_factor - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_passing_always_moves_forward() {
        for quality in [3.0, 3.5, 4.0, 5.0] {
            for streak in 0..6 {
                let start = Item {
                    easiness_factor: 1.3,
                    ..scheduled(streak, 1)
                };
                let next = schedule_next_review(&start, quality, NOW);
                assert!(next.easiness_factor >= 1.3);
                assert!(next.next_repetition > next.last_repetition);
            }
        }
    }

    #[test]
    fn test_failing_is_due_within_a_day() {
        for quality in [0.0, 1.0, 2.0, 2.9] {
            let next = schedule_next_review(&scheduled(4, 30), quality, NOW);
            assert_eq!(next.actual_times_repeated, 0);
            assert!(next.extra_repeat_today);
            assert!(next.next_repetition <= NOW + SECONDS_PER_DAY);
            assert!(next.next_repetition >= next.last_repetition);
        }
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let high = schedule_next_review(&item(), 42.0, NOW);
        let five = schedule_next_review(&item(), 5.0, NOW);
        assert_eq!(high, five);

        let low = schedule_next_review(&scheduled(2, 6), -3.0, NOW);
        assert!(low.extra_repeat_today);

        let nan = schedule_next_review(&scheduled(2, 6), f64::NAN, NOW);
        assert_eq!(nan, schedule_next_review(&scheduled(2, 6), 0.0, NOW));
    }

    #[test]
    fn test_deterministic() {
        let start = scheduled(2, 6);
        let a = schedule_next_review(&start, 4.0, NOW);
        let b = schedule_next_review(&start, 4.0, NOW);
        assert_eq!(a.previous_days_change, b.previous_days_change);
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_params() {
        let scheduler = Scheduler::new(SchedulerParams {
            first_interval_days: 2,
            second_interval_days: 5,
            passing_quality: 4.0,
            ..SchedulerParams::default()
        });

        let next = scheduler.schedule(&item(), 4.0, NOW);
        assert_eq!(next.previous_days_change, 2);

        let failed = scheduler.schedule(&scheduled(1, 2), 3.0, NOW);
        assert!(failed.extra_repeat_today);
    }

    #[test]
    fn test_long_passing_streak_stays_bounded() {
        let mut state = item();
        for step in 0..60 {
            state = schedule_next_review(&state, 5.0, NOW);
            assert!(state.next_repetition >= state.last_repetition, "step {step}");
            assert!(state.previous_days_change <= 3650, "step {step}");
        }
        assert_eq!(state.previous_days_change, 3650);
        assert_eq!(state.next_repetition, NOW + 3650 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_interval_capped_by_params() {
        let scheduler = Scheduler::new(SchedulerParams {
            max_interval_days: 30,
            ..SchedulerParams::default()
        });
        let next = scheduler.schedule(&scheduled(5, 25), 5.0, NOW);
        assert_eq!(next.previous_days_change, 30);

        // Timestamps near the end of the range saturate instead of wrapping
        let late = scheduler.schedule(&scheduled(5, 25), 5.0, i64::MAX - 10);
        assert_eq!(late.next_repetition, i64::MAX);
        assert!(late.next_repetition >= late.last_repetition);
    }

    #[test]
    fn test_clamp_quality() {
        assert_eq!(clamp_quality(7.0), 5.0);
        assert_eq!(clamp_quality(-1.0), 0.0);
        assert_eq!(clamp_quality(f64::NAN), 0.0);
        assert!(is_valid_quality(2.5));
        assert!(!is_valid_quality(5.5));
        assert!(!is_valid_quality(f64::NAN));
    }
}
