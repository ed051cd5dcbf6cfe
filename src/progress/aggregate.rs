use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub completed_count: usize,
    pub total_count: usize,
    pub percentage: u32,
}

/// Percentage rounds half up. `completed` is not clamped to `total`, so an
/// anomalous count yields a percentage above 100.
pub fn compute_progress(total: usize, completed: usize) -> CourseProgress {
    let percentage = if total == 0 {
        0
    } else {
        let (total, completed) = (total as u128, completed as u128);
        let rounded = (completed * 200 + total) / (total * 2);
        u32::try_from(rounded).unwrap_or(u32::MAX)
    };

    CourseProgress {
        completed_count: completed,
        total_count: total,
        percentage,
    }
}
