use anyhow::{Context, Result};

use crate::api::JobsApi;
use crate::models::{AggregateSummary, JobRecord, Stage};

/// The one authoritative in-memory copy of the user's job records and the
/// server-computed summary. Every view derives from this; only the
/// transition controller writes to it. Records are never invented here --
/// each one arrived in a `reload` response, and local patches only touch
/// records already present.
#[derive(Debug, Default)]
pub struct JobCollectionStore {
    jobs: Vec<JobRecord>,
    summary: AggregateSummary,
}

impl JobCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn summary(&self) -> &AggregateSummary {
        &self.summary
    }

    pub fn get(&self, job_id: &str) -> Option<&JobRecord> {
        self.jobs.iter().find(|j| j.key() == job_id)
    }

    /// Replace both held values wholesale from the service. No partial
    /// merge: the fetched snapshot wins completely. On failure the previous
    /// snapshot stays in place and the error propagates.
    pub fn reload(&mut self, api: &dyn JobsApi) -> Result<()> {
        let response = api
            .fetch_collection()
            .context("Failed to load your jobs")?;
        self.jobs = response.jobs;
        self.summary = response.summary;
        Ok(())
    }

    /// Optimistic in-place status overwrite, visible until the next
    /// `reload` supersedes it. Returns false when no such record exists.
    pub fn patch_status(&mut self, job_id: &str, stage: Stage) -> bool {
        match self.jobs.iter_mut().find(|j| j.key() == job_id) {
            Some(job) => {
                job.status = Some(stage);
                true
            }
            None => false,
        }
    }

    /// Drop a record after the service confirmed its deletion.
    pub fn remove_local(&mut self, job_id: &str) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.key() != job_id);
        self.jobs.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{test_record, MyJobsResponse, SearchResultSet};
    use anyhow::anyhow;
    use std::cell::Cell;

    /// Serves a fixed snapshot, or errors when `fail` is set.
    struct FixedApi {
        jobs: Vec<JobRecord>,
        summary: AggregateSummary,
        fail: Cell<bool>,
    }

    impl FixedApi {
        fn new(jobs: Vec<JobRecord>, summary: AggregateSummary) -> Self {
            Self { jobs, summary, fail: Cell::new(false) }
        }
    }

    impl JobsApi for FixedApi {
        fn fetch_collection(&self) -> Result<MyJobsResponse> {
            if self.fail.get() {
                return Err(anyhow!("503 service unavailable"));
            }
            Ok(MyJobsResponse { jobs: self.jobs.clone(), summary: self.summary.clone() })
        }
        fn search(&self, _role: &str, _experience: u32) -> Result<SearchResultSet> {
            unimplemented!("not used by the store")
        }
        fn update_status(&self, _job_id: &str, _stage: Stage) -> Result<()> {
            Ok(())
        }
        fn delete_tracked(&self, _job_id: &str) -> Result<()> {
            Ok(())
        }
        fn delete_saved(&self, _job_id: &str) -> Result<()> {
            Ok(())
        }
        fn track(&self, _job_id: &str) -> Result<()> {
            Ok(())
        }
        fn save(&self, _job_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_reload_replaces_wholesale() {
        let mut store = JobCollectionStore::new();
        store.jobs = vec![test_record("stale", Some(Stage::Applied), None)];

        let summary = AggregateSummary { applied: 2, hired: 1, ..Default::default() };
        let api = FixedApi::new(
            vec![
                test_record("1", Some(Stage::Applied), None),
                test_record("2", Some(Stage::Hired), None),
            ],
            summary,
        );

        store.reload(&api).unwrap();
        assert_eq!(store.jobs().len(), 2);
        assert!(store.get("stale").is_none());
        assert_eq!(store.summary().applied, 2);
        assert_eq!(store.summary().hired, 1);
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        let mut store = JobCollectionStore::new();
        let api = FixedApi::new(vec![test_record("1", Some(Stage::Applied), None)], AggregateSummary::default());
        store.reload(&api).unwrap();

        api.fail.set(true);
        assert!(store.reload(&api).is_err());
        assert_eq!(store.jobs().len(), 1);
        assert!(store.get("1").is_some());
    }

    #[test]
    fn test_patch_status_only_touches_existing_records() {
        let mut store = JobCollectionStore::new();
        let api = FixedApi::new(vec![test_record("1", Some(Stage::Applied), None)], AggregateSummary::default());
        store.reload(&api).unwrap();

        assert!(store.patch_status("1", Stage::Hired));
        assert_eq!(store.get("1").unwrap().status, Some(Stage::Hired));

        // A patch for an unknown id never grows the collection
        assert!(!store.patch_status("ghost", Stage::Applied));
        assert_eq!(store.jobs().len(), 1);
    }

    #[test]
    fn test_remove_local_drops_by_id() {
        let mut store = JobCollectionStore::new();
        let api = FixedApi::new(
            vec![
                test_record("1", Some(Stage::Applied), None),
                test_record("2", None, Some("2025-06-01T10:00:00")),
            ],
            AggregateSummary::default(),
        );
        store.reload(&api).unwrap();

        assert!(store.remove_local("2"));
        assert!(!store.remove_local("2"));
        assert_eq!(store.jobs().len(), 1);
        assert_eq!(store.jobs()[0].key(), "1");
    }
}
