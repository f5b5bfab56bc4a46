use thiserror::Error;

/// Failures surfaced by review operations
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The item does not exist or belongs to another user
    #[error("Item not found: {item_id} (user {user_id})")]
    ItemNotFound { item_id: String, user_id: String },

    /// Evaluation outside 0-5 while clamping is disabled
    #[error("Invalid evaluation: {0} (expected 0-5)")]
    InvalidEvaluation(f64),

    /// The item kept changing underneath us
    #[error("Item {item_id} was modified concurrently")]
    Conflict { item_id: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ReviewError>;
