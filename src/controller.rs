use anyhow::{Context, Result};

use crate::api::JobsApi;
use crate::models::Stage;
use crate::store::JobCollectionStore;

/// Orchestrates every mutation of the collection: optimistic status moves
/// and deletions, each reconciled against the service by an unconditional
/// refetch. Nothing else in the client writes to the store.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The record was already at the requested stage; nothing happened.
    Unchanged,
    /// The service accepted the move and the store holds its confirmed state.
    Updated,
}

/// Funnel for gesture adapters: a card moved from `from` to `to`, whether by
/// a key-driven column move, a stage hotkey, or a CLI command. Dropping a
/// card back on its own column is a no-op before any lookup happens.
pub fn transition(
    api: &dyn JobsApi,
    store: &mut JobCollectionStore,
    job_id: &str,
    from: Stage,
    to: Stage,
) -> Result<TransitionOutcome> {
    if from == to {
        return Ok(TransitionOutcome::Unchanged);
    }
    request_transition(api, store, job_id, to)
}

/// Move a record to `to`, optimistically first, then settle on whatever the
/// service says. The patched status shows until the reconciliation fetch
/// lands; the fetched snapshot (including the summary, which only the
/// service computes) supersedes it on success and reverts it on failure.
pub fn request_transition(
    api: &dyn JobsApi,
    store: &mut JobCollectionStore,
    job_id: &str,
    to: Stage,
) -> Result<TransitionOutcome> {
    // Already there: nothing to patch, nothing to send.
    if store.get(job_id).and_then(|j| j.status) == Some(to) {
        return Ok(TransitionOutcome::Unchanged);
    }

    store.patch_status(job_id, to);

    if let Err(update_err) = api.update_status(job_id, to) {
        // Revert by refetch: the server snapshot discards the optimistic
        // patch. The update failure is what the user needs to see, so the
        // reload error only wins if the revert itself failed.
        store
            .reload(api)
            .context("Status update failed and the revert fetch also failed")?;
        return Err(update_err.context("Status update failed; your board was restored"));
    }

    store
        .reload(api)
        .context("Status updated but refreshing the board failed")?;
    Ok(TransitionOutcome::Updated)
}

/// Delete a record through the endpoint matching how the user holds it
/// (bookmark vs tracked application). The record only leaves the local
/// collection after the service confirms; a failed delete changes nothing.
pub fn request_deletion(
    api: &dyn JobsApi,
    store: &mut JobCollectionStore,
    job_id: &str,
    saved_only: bool,
) -> Result<()> {
    if saved_only {
        api.delete_saved(job_id).context("Failed to remove saved job")?;
    } else {
        api.delete_tracked(job_id).context("Failed to remove application")?;
    }

    store.remove_local(job_id);
    store
        .reload(api)
        .context("Job removed but refreshing the board failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{test_record, AggregateSummary, JobRecord, MyJobsResponse, SearchResultSet};
    use anyhow::anyhow;
    use std::cell::{Cell, RefCell};

    /// Fake service: replays a scripted server snapshot and records every
    /// call so tests can assert on wire traffic.
    #[derive(Default)]
    struct ScriptedApi {
        server_jobs: RefCell<Vec<JobRecord>>,
        server_summary: RefCell<AggregateSummary>,
        calls: RefCell<Vec<String>>,
        fail_update: Cell<bool>,
        fail_delete: Cell<bool>,
    }

    impl ScriptedApi {
        fn with_jobs(jobs: Vec<JobRecord>) -> Self {
            let api = Self::default();
            *api.server_jobs.borrow_mut() = jobs;
            api
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl JobsApi for ScriptedApi {
        fn fetch_collection(&self) -> Result<MyJobsResponse> {
            self.calls.borrow_mut().push("fetch".to_string());
            Ok(MyJobsResponse {
                jobs: self.server_jobs.borrow().clone(),
                summary: self.server_summary.borrow().clone(),
            })
        }

        fn search(&self, _role: &str, _experience: u32) -> Result<SearchResultSet> {
            unimplemented!("not used by the controller")
        }

        fn update_status(&self, job_id: &str, stage: Stage) -> Result<()> {
            self.calls.borrow_mut().push(format!("patch {} {}", job_id, stage));
            if self.fail_update.get() {
                return Err(anyhow!("500 internal server error"));
            }
            // The service applies the move and recomputes its summary.
            for job in self.server_jobs.borrow_mut().iter_mut() {
                if job.key() == job_id {
                    job.status = Some(stage);
                }
            }
            let mut summary = AggregateSummary::default();
            for job in self.server_jobs.borrow().iter() {
                match job.status {
                    Some(Stage::Applied) => summary.applied += 1,
                    Some(Stage::Inprocess) => summary.inprocess += 1,
                    Some(Stage::Rejected) => summary.rejected += 1,
                    Some(Stage::Hired) => summary.hired += 1,
                    None => summary.saved += 1,
                }
            }
            *self.server_summary.borrow_mut() = summary;
            Ok(())
        }

        fn delete_tracked(&self, job_id: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("delete-tracked {}", job_id));
            if self.fail_delete.get() {
                return Err(anyhow!("502 bad gateway"));
            }
            self.server_jobs.borrow_mut().retain(|j| j.key() != job_id);
            Ok(())
        }

        fn delete_saved(&self, job_id: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("delete-saved {}", job_id));
            if self.fail_delete.get() {
                return Err(anyhow!("502 bad gateway"));
            }
            self.server_jobs.borrow_mut().retain(|j| j.key() != job_id);
            Ok(())
        }

        fn track(&self, _job_id: &str) -> Result<()> {
            Ok(())
        }

        fn save(&self, _job_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn loaded(api: &ScriptedApi) -> JobCollectionStore {
        let mut store = JobCollectionStore::new();
        store.reload(api).unwrap();
        api.calls.borrow_mut().clear();
        store
    }

    #[test]
    fn test_transition_to_current_status_is_a_no_op() {
        let api = ScriptedApi::with_jobs(vec![test_record("1", Some(Stage::Applied), None)]);
        let mut store = loaded(&api);

        let outcome = request_transition(&api, &mut store, "1", Stage::Applied).unwrap();
        assert_eq!(outcome, TransitionOutcome::Unchanged);
        // Zero remote calls, zero store mutation
        assert!(api.calls().is_empty());
        assert_eq!(store.get("1").unwrap().status, Some(Stage::Applied));
    }

    #[test]
    fn test_same_column_drop_short_circuits() {
        let api = ScriptedApi::with_jobs(vec![test_record("1", Some(Stage::Applied), None)]);
        let mut store = loaded(&api);

        let outcome = transition(&api, &mut store, "1", Stage::Applied, Stage::Applied).unwrap();
        assert_eq!(outcome, TransitionOutcome::Unchanged);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_successful_transition_settles_on_server_state() {
        let api = ScriptedApi::with_jobs(vec![
            test_record("1", Some(Stage::Applied), None),
            test_record("2", Some(Stage::Applied), None),
        ]);
        let mut store = loaded(&api);

        let outcome = request_transition(&api, &mut store, "1", Stage::Hired).unwrap();
        assert_eq!(outcome, TransitionOutcome::Updated);
        assert_eq!(store.get("1").unwrap().status, Some(Stage::Hired));
        // Summary is the server's latest, not a local recount
        assert_eq!(store.summary().applied, 1);
        assert_eq!(store.summary().hired, 1);
        assert_eq!(api.calls(), vec!["patch 1 hired", "fetch"]);
    }

    #[test]
    fn test_failed_transition_reverts_to_server_value() {
        let api = ScriptedApi::with_jobs(vec![test_record("1", Some(Stage::Applied), None)]);
        let mut store = loaded(&api);
        api.fail_update.set(true);

        let err = request_transition(&api, &mut store, "1", Stage::Rejected).unwrap_err();
        assert!(err.to_string().contains("restored"));
        // The optimistic patch is gone; the store shows the server value
        assert_eq!(store.get("1").unwrap().status, Some(Stage::Applied));
        // Reconciliation ran despite the failure
        assert_eq!(api.calls(), vec!["patch 1 rejected", "fetch"]);
    }

    #[test]
    fn test_saved_to_applied_promotes_a_bookmark() {
        // "Mark as applied" on a saved-only card goes through the same path
        let api = ScriptedApi::with_jobs(vec![test_record("1", None, Some("2025-06-01T10:00:00"))]);
        let mut store = loaded(&api);

        request_transition(&api, &mut store, "1", Stage::Applied).unwrap();
        assert_eq!(store.get("1").unwrap().status, Some(Stage::Applied));
        assert_eq!(api.calls(), vec!["patch 1 applied", "fetch"]);
    }

    #[test]
    fn test_deletion_picks_endpoint_by_kind() {
        let api = ScriptedApi::with_jobs(vec![
            test_record("1", Some(Stage::Applied), None),
            test_record("2", None, Some("2025-06-01T10:00:00")),
        ]);
        let mut store = loaded(&api);

        request_deletion(&api, &mut store, "2", true).unwrap();
        assert_eq!(api.calls(), vec!["delete-saved 2", "fetch"]);
        assert!(store.get("2").is_none());

        api.calls.borrow_mut().clear();
        request_deletion(&api, &mut store, "1", false).unwrap();
        assert_eq!(api.calls(), vec!["delete-tracked 1", "fetch"]);
        assert!(store.jobs().is_empty());
    }

    #[test]
    fn test_failed_deletion_leaves_store_untouched() {
        let api = ScriptedApi::with_jobs(vec![test_record("1", Some(Stage::Applied), None)]);
        let mut store = loaded(&api);
        api.fail_delete.set(true);

        assert!(request_deletion(&api, &mut store, "1", false).is_err());
        assert!(store.get("1").is_some());
        // No reconciliation fetch either; the record was never touched
        assert_eq!(api.calls(), vec!["delete-tracked 1"]);
    }
}
