//! Pure derivations over already-loaded course and completion data.

pub mod aggregate;
pub mod badge;
pub mod streak;
pub mod unlock;

pub use aggregate::{CourseProgress, compute_progress};
pub use badge::{BadgePolicy, Band, BandOrder};
pub use streak::{completion_days, compute_streak};
pub use unlock::{LessonState, ModuleState, count_lessons, derive_lesson_states, find_lesson};
