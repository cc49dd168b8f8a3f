//! Todo progress calculation
//!
//! A todo's progress is derived from its tasks on every read and is never
//! stored. Only the completion flag is persisted, and it is refreshed
//! whenever a task is toggled, added or removed.
//!
//! - no tasks: `progress = -1`, `is_complete = false`
//! - otherwise: `progress = floor(100 * completed / total)`, complete iff all tasks are
//!
//! ```
//! use tasca_shared::progress::Progress;
//!
//! let p = Progress::from_completions([true, false, false]);
//! assert_eq!(p.progress, 33);
//! assert!(!p.is_complete);
//!
//! assert_eq!(Progress::from_completions([]), Progress::EMPTY);
//! ```

use serde::{Deserialize, Serialize};

/// Progress value reported for a todo without tasks
pub const NO_TASKS: i32 = -1;

/// Derived completion state of a todo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Percentage in `0..=100`, or [`NO_TASKS`]
    pub progress: i32,

    /// True iff there is at least one task and all are complete
    pub is_complete: bool,
}

impl Progress {
    /// Progress of a todo with zero tasks
    pub const EMPTY: Progress = Progress {
        progress: NO_TASKS,
        is_complete: false,
    };

    /// Computes progress from task counts
    ///
    /// `completed` is clamped to `0..=total`.
    pub fn from_counts(total: i64, completed: i64) -> Self {
        if total <= 0 {
            return Self::EMPTY;
        }

        let completed = completed.clamp(0, total);

        Self {
            progress: ((completed * 100) / total) as i32,
            is_complete: completed == total,
        }
    }

    /// Computes progress from each task's completion flag
    pub fn from_completions<I>(completions: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let (total, completed) = completions
            .into_iter()
            .fold((0i64, 0i64), |(total, done), c| (total + 1, done + i64::from(c)));

        Self::from_counts(total, completed)
    }

    /// Whether the todo has any tasks at all
    pub fn has_tasks(&self) -> bool {
        self.progress != NO_TASKS
    }
}
