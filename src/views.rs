//! Pure projections over the collection. Each call walks the current
//! snapshot and hands back borrows in collection order, so a caller
//! re-rendering after a reload always sees the fresh state and the
//! collection itself is never touched.

use crate::models::{JobRecord, Stage};

/// One kanban column: records sitting at `stage`.
pub fn by_stage(jobs: &[JobRecord], stage: Stage) -> Vec<&JobRecord> {
    jobs.iter().filter(|j| j.status == Some(stage)).collect()
}

/// Flat table of everything with a pipeline status.
pub fn tracked_table(jobs: &[JobRecord]) -> Vec<&JobRecord> {
    jobs.iter().filter(|j| j.is_tracked()).collect()
}

/// Bookmarked records the user never formally tracked.
pub fn saved_only(jobs: &[JobRecord]) -> Vec<&JobRecord> {
    jobs.iter().filter(|j| j.is_saved_only()).collect()
}
