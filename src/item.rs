use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Easiness factor given to freshly created items
pub const DEFAULT_EASINESS_FACTOR: f64 = 2.5;

/// Review state of one flashcard for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub user_id: String,
    pub flashcard_id: String,
    /// SM-2 difficulty multiplier, never below 1.3
    pub easiness_factor: f64,
    /// Streak of passing evaluations
    pub actual_times_repeated: u32,
    /// Every evaluation ever made, passing or not
    pub times_repeated: u32,
    /// Unix seconds
    pub last_repetition: i64,
    /// Unix seconds, 0 while the item has never been scheduled
    pub next_repetition: i64,
    /// Interval in days chosen by the last scheduling step
    pub previous_days_change: i64,
    /// Set by a failing evaluation so the card comes back in the same session
    pub extra_repeat_today: bool,
}

impl Item {
    /// Create a never-reviewed item with a generated id
    pub fn new(user_id: &str, flashcard_id: &str) -> Self {
        Self::with_id(&uuid::Uuid::new_v4().to_string(), user_id, flashcard_id)
    }

    pub fn with_id(id: &str, user_id: &str, flashcard_id: &str) -> Self {
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            flashcard_id: flashcard_id.to_string(),
            easiness_factor: DEFAULT_EASINESS_FACTOR,
            actual_times_repeated: 0,
            times_repeated: 0,
            last_repetition: 0,
            next_repetition: 0,
            previous_days_change: 0,
            extra_repeat_today: false,
        }
    }

    /// Never scheduled
    pub fn is_new(&self) -> bool {
        self.next_repetition == 0
    }
}

/// An evaluation submitted by a client. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub item_id: String,
    pub evaluation: f64,
}

/// Swipe outcomes offered by the mobile client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    /// Swipe left - did not know it
    Bad = 1,
    /// Swipe up - guessed
    Unsure = 2,
    /// Swipe down - recalled with effort
    Almost = 3,
    /// Swipe right - recalled
    Good = 5,
}

impl Grade {
    /// Quality on the 0-5 SM-2 scale
    pub fn quality(&self) -> f64 {
        *self as u8 as f64
    }

    pub fn name(&self) -> &'static str {
        match self {
            Grade::Bad => "bad",
            Grade::Unsure => "unsure",
            Grade::Almost => "almost",
            Grade::Good => "good",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Grade {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bad" => Ok(Grade::Bad),
            "unsure" => Ok(Grade::Unsure),
            "almost" => Ok(Grade::Almost),
            "good" => Ok(Grade::Good),
            other => anyhow::bail!(
                "Unknown grade '{}'. Use 'bad', 'unsure', 'almost', 'good' or a number 0-5.",
                other
            ),
        }
    }
}

/// Parse either a grade name or a raw quality number
pub fn parse_quality(s: &str) -> anyhow::Result<f64> {
    if let Ok(q) = s.trim().parse::<f64>() {
        return Ok(q);
    }
    Ok(s.parse::<Grade>()?.quality())
}
