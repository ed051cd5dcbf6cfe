pub mod import_service;
pub mod progress_service;
pub mod scheduler;

pub use import_service::{ImportService, ImportStats, RefreshStats};
pub use progress_service::{CourseSummary, CourseView, Dashboard, ProgressService};
pub use scheduler::RefreshScheduler;
