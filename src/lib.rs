//! SM-2 spaced repetition for flashcard courses.
//!
//! [`scheduler`] decides when an item is shown next after it is graded,
//! [`queue`] answers the session-count and forecast queries, and [`app`]
//! ties both to an [`storage::ItemStore`] and a [`clock::Clock`].

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod item;
pub mod queue;
pub mod scheduler;
pub mod storage;

pub use app::App;
pub use error::ReviewError;
pub use item::{Evaluation, Grade, Item};
pub use queue::{
    DayCount, ReviewQueryEngine, SessionCount, SessionProgress, compute_due_reviews,
    compute_session_counts,
};
pub use scheduler::{Scheduler, SchedulerParams, schedule_next_review};
