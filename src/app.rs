use crate::clock::Clock;
use crate::config::Config;
use crate::error::{Result, ReviewError};
use crate::item::{Evaluation, Item};
use crate::queue::{DayCount, ReviewQueryEngine, SessionCount, SessionProgress};
use crate::scheduler::{Scheduler, is_valid_quality};
use crate::storage::ItemStore;

/// Attempts at a compare-and-swap update before giving up
const MAX_UPDATE_ATTEMPTS: usize = 3;

/// Review operations over an item store
pub struct App<S, C> {
    store: S,
    clock: C,
    scheduler: Scheduler,
    engine: ReviewQueryEngine,
    clamp_evaluations: bool,
}

impl<S: ItemStore, C: Clock> App<S, C> {
    pub fn new(store: S, clock: C, config: &Config) -> Self {
        Self {
            store,
            clock,
            scheduler: Scheduler::new(config.scheduler.clone()),
            engine: ReviewQueryEngine::new(config.learning_threshold),
            clamp_evaluations: config.clamp_evaluations,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create items for flashcards the user has just been shown.
    /// Flashcards the user already has items for are skipped.
    pub fn create_items(&self, user_id: &str, flashcard_ids: &[String]) -> Result<Vec<Item>> {
        let mut created = Vec::new();

        for flashcard_id in flashcard_ids {
            let item = Item::new(user_id, flashcard_id);
            if self.store.insert(&item)? {
                created.push(item);
            } else {
                tracing::debug!(user_id, %flashcard_id, "Item already exists");
            }
        }

        tracing::info!(user_id, created = created.len(), "Created items");
        Ok(created)
    }

    /// Grade an item and persist its new schedule
    pub fn process_evaluation(&self, user_id: &str, item_id: &str, evaluation: f64) -> Result<Item> {
        if !self.clamp_evaluations && !is_valid_quality(evaluation) {
            return Err(ReviewError::InvalidEvaluation(evaluation));
        }

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let current = self.store.get(item_id, user_id)?.ok_or_else(|| {
                ReviewError::ItemNotFound {
                    item_id: item_id.to_string(),
                    user_id: user_id.to_string(),
                }
            })?;

            let now = self.clock.now();
            let next = self.scheduler.schedule(&current, evaluation, now);

            if self.store.put_if_unchanged(&current, &next)? {
                tracing::info!(
                    item_id,
                    user_id,
                    evaluation,
                    streak = next.actual_times_repeated,
                    interval_days = next.previous_days_change,
                    easiness = next.easiness_factor,
                    "Scheduled next review"
                );
                return Ok(next);
            }

            tracing::warn!(item_id, attempt, "Item changed during evaluation, retrying");
        }

        Err(ReviewError::Conflict {
            item_id: item_id.to_string(),
        })
    }

    pub fn evaluate(&self, user_id: &str, evaluation: &Evaluation) -> Result<Item> {
        self.process_evaluation(user_id, &evaluation.item_id, evaluation.evaluation)
    }

    pub fn items(&self, user_id: &str) -> Result<Vec<Item>> {
        Ok(self.store.list(user_id)?)
    }

    /// Items to study right now
    pub fn session(&self, user_id: &str) -> Result<Vec<Item>> {
        let items = self.store.list(user_id)?;
        Ok(self.engine.session_items(&items, self.clock.now()))
    }

    pub fn session_count(&self, user_id: &str, done: SessionProgress) -> Result<SessionCount> {
        let items = self.store.list(user_id)?;
        Ok(self
            .engine
            .compute_session_counts(&items, self.clock.now(), done))
    }

    /// Upcoming reviews per UTC day
    pub fn reviews(&self, user_id: &str) -> Result<Vec<DayCount>> {
        let items = self.store.list(user_id)?;
        Ok(self.engine.compute_due_reviews(&items, self.clock.now()))
    }
}
