//! Review-queue queries: session bucket counts and the upcoming-review forecast.
//!
//! Both queries are pure functions of an item snapshot and the current time.

use crate::item::Item;
use crate::scheduler::SECONDS_PER_DAY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest streak still counted as "due" rather than "review"
pub const DEFAULT_LEARNING_THRESHOLD: u32 = 2;

/// Which part of a session an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    New,
    Due,
    Review,
}

/// Items already evaluated in the current session, per bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub new_done: u32,
    pub due_done: u32,
    pub review_done: u32,
}

/// Every item of a user grouped by learning stage: never scheduled (new),
/// still on the short learning steps (due), or on an established interval
/// (review). Scheduled items count whether or not they are due yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCount {
    pub new_total: u32,
    pub new_done: u32,
    pub due_total: u32,
    pub due_done: u32,
    pub review_total: u32,
    pub review_done: u32,
}

impl SessionCount {
    pub fn total(&self) -> u32 {
        self.new_total + self.due_total + self.review_total
    }
}

/// Number of reviews scheduled on one UTC day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    /// Unix timestamp of the UTC start of day
    pub ts: i64,
    pub count: u32,
}

/// Unix timestamp of the UTC midnight at or before `ts`
pub fn start_of_utc_day(ts: i64) -> i64 {
    ts.div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY
}

#[derive(Debug, Clone)]
pub struct ReviewQueryEngine {
    learning_threshold: u32,
}

impl Default for ReviewQueryEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LEARNING_THRESHOLD)
    }
}

impl ReviewQueryEngine {
    pub fn new(learning_threshold: u32) -> Self {
        Self { learning_threshold }
    }

    /// Whether the item's extra repeat belongs to the day of `now`
    fn has_extra_repeat_today(item: &Item, now: i64) -> bool {
        item.extra_repeat_today && start_of_utc_day(item.last_repetition) == start_of_utc_day(now)
    }

    pub fn classify(&self, item: &Item, now: i64) -> Bucket {
        if item.is_new() {
            Bucket::New
        } else if item.actual_times_repeated <= self.learning_threshold
            || Self::has_extra_repeat_today(item, now)
        {
            Bucket::Due
        } else {
            Bucket::Review
        }
    }

    /// Group `items` by learning stage. Every item lands in exactly one
    /// bucket, including items scheduled after `now`. `done` comes from the
    /// caller and is clamped to each bucket's total.
    pub fn compute_session_counts(
        &self,
        items: &[Item],
        now: i64,
        done: SessionProgress,
    ) -> SessionCount {
        let mut counts = SessionCount::default();

        for item in items {
            match self.classify(item, now) {
                Bucket::New => counts.new_total += 1,
                Bucket::Due => counts.due_total += 1,
                Bucket::Review => counts.review_total += 1,
            }
        }

        counts.new_done = done.new_done.min(counts.new_total);
        counts.due_done = done.due_done.min(counts.due_total);
        counts.review_done = done.review_done.min(counts.review_total);

        if counts.new_done != done.new_done
            || counts.due_done != done.due_done
            || counts.review_done != done.review_done
        {
            tracing::debug!(?done, ?counts, "Session progress exceeded bucket totals");
        }

        counts
    }

    /// Items to present in a session started at `now`: new cards first,
    /// then everything already due, oldest first.
    pub fn session_items(&self, items: &[Item], now: i64) -> Vec<Item> {
        let mut session: Vec<Item> = items
            .iter()
            .filter(|item| {
                item.is_new()
                    || item.next_repetition <= now
                    || Self::has_extra_repeat_today(item, now)
            })
            .cloned()
            .collect();

        session.sort_by_key(|item| (!item.is_new(), item.next_repetition));
        session
    }

    /// Reviews strictly after `now`, counted per UTC day in ascending order.
    /// Days without reviews are left out.
    pub fn compute_due_reviews(&self, items: &[Item], now: i64) -> Vec<DayCount> {
        let mut per_day: BTreeMap<i64, u32> = BTreeMap::new();

        for item in items.iter().filter(|item| item.next_repetition > now) {
            *per_day.entry(start_of_utc_day(item.next_repetition)).or_insert(0) += 1;
        }

        per_day
            .into_iter()
            .map(|(ts, count)| DayCount { ts, count })
            .collect()
    }
}

pub fn compute_session_counts(items: &[Item], now: i64, done: SessionProgress) -> SessionCount {
    ReviewQueryEngine::default().compute_session_counts(items, now, done)
}

pub fn compute_due_reviews(items: &[Item], now: i64) -> Vec<DayCount> {
    ReviewQueryEngine::default().compute_due_reviews(items, now)
}
