use chrono::{DateTime, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

use crate::models::JobRecord;

// --- Source classification ---

/// Board the posting came from, bucketed from the free-text `source` label.
/// Every record lands in exactly one bucket; anything unrecognized
/// (including a missing label) is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    LinkedIn,
    Indeed,
    Glassdoor,
    Other,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::LinkedIn => "LinkedIn",
            Source::Indeed => "Indeed",
            Source::Glassdoor => "Glassdoor",
            Source::Other => "Others",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn classify(source: Option<&str>) -> Source {
    let s = source.unwrap_or("").to_lowercase();
    if s.contains("linkedin") {
        Source::LinkedIn
    } else if s.contains("indeed") {
        Source::Indeed
    } else if s.contains("glassdoor") {
        Source::Glassdoor
    } else {
        Source::Other
    }
}

/// Filter-bar selection: `None` is the All bucket. Cycles in bar order.
pub const FILTERS: [Option<Source>; 5] = [
    None,
    Some(Source::LinkedIn),
    Some(Source::Indeed),
    Some(Source::Glassdoor),
    Some(Source::Other),
];

pub fn filter_label(filter: Option<Source>) -> &'static str {
    match filter {
        None => "All",
        Some(source) => source.label(),
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linkedin" => Ok(Source::LinkedIn),
            "indeed" => Ok(Source::Indeed),
            "glassdoor" => Ok(Source::Glassdoor),
            "other" | "others" => Ok(Source::Other),
            _ => Err(anyhow::anyhow!(
                "Unknown source '{}'. Valid sources: linkedin, indeed, glassdoor, others",
                s
            )),
        }
    }
}

// --- Sort orders ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Descending AI match score, missing score counts as 0.
    Score,
    /// Newest posting first; unparseable or missing dates sort last.
    Latest,
    /// Company name ascending, case-insensitive; missing company first.
    Company,
}

impl SortOrder {
    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Score => "AI Match Score",
            SortOrder::Latest => "Latest First",
            SortOrder::Company => "Company Name",
        }
    }

    pub fn next(&self) -> SortOrder {
        match self {
            SortOrder::Score => SortOrder::Latest,
            SortOrder::Latest => SortOrder::Company,
            SortOrder::Company => SortOrder::Score,
        }
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "score" => Ok(SortOrder::Score),
            "latest" => Ok(SortOrder::Latest),
            "company" => Ok(SortOrder::Company),
            _ => Err(anyhow::anyhow!(
                "Unknown sort '{}'. Valid sorts: score, latest, company",
                s
            )),
        }
    }
}

/// Posting timestamp as epoch seconds. The service emits RFC 3339 with or
/// without an offset; anything that fails both parses gets `i64::MIN` so it
/// lands after every dated record in latest-first order.
fn posted_timestamp(job: &JobRecord) -> i64 {
    let Some(raw) = job.posted_at.as_deref() else {
        return i64::MIN;
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.timestamp();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc().timestamp();
    }
    i64::MIN
}

/// Derive a fresh, filtered, sorted sequence from a result list. The input
/// is never touched, so calling again with a different selector re-derives
/// from the same set. Sorts are stable: ties keep their input order.
pub fn process(jobs: &[JobRecord], filter: Option<Source>, sort: SortOrder) -> Vec<JobRecord> {
    let mut out: Vec<JobRecord> = jobs
        .iter()
        .filter(|job| match filter {
            None => true,
            Some(bucket) => classify(job.source.as_deref()) == bucket,
        })
        .cloned()
        .collect();

    match sort {
        SortOrder::Score => {
            out.sort_by(|a, b| {
                let a_score = a.ai_score.unwrap_or(0.0);
                let b_score = b.ai_score.unwrap_or(0.0);
                b_score.total_cmp(&a_score)
            });
        }
        SortOrder::Latest => {
            out.sort_by(|a, b| posted_timestamp(b).cmp(&posted_timestamp(a)));
        }
        SortOrder::Company => {
            out.sort_by(|a, b| {
                let a_company = a.company.as_deref().unwrap_or("").to_lowercase();
                let b_company = b.company.as_deref().unwrap_or("").to_lowercase();
                a_company.cmp(&b_company)
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_record;

    fn hit(id: &str, source: Option<&str>, score: Option<f64>, company: Option<&str>, posted: Option<&str>) -> JobRecord {
        let mut job = test_record(id, None, None);
        job.source = source.map(str::to_string);
        job.ai_score = score;
        job.company = company.map(str::to_string);
        job.posted_at = posted.map(str::to_string);
        job
    }

    #[test]
    fn test_classification_is_total() {
        assert_eq!(classify(Some("LinkedIn Jobs")), Source::LinkedIn);
        assert_eq!(classify(Some("via indeed.com")), Source::Indeed);
        assert_eq!(classify(Some("Glassdoor")), Source::Glassdoor);
        assert_eq!(classify(Some("Wellfound")), Source::Other);
        assert_eq!(classify(Some("")), Source::Other);
        assert_eq!(classify(None), Source::Other);
    }

    #[test]
    fn test_all_filter_keeps_full_membership() {
        let jobs = vec![
            hit("1", Some("LinkedIn"), None, None, None),
            hit("2", Some("indeed"), None, None, None),
            hit("3", None, None, None, None),
        ];
        let out = process(&jobs, None, SortOrder::Score);
        assert_eq!(out.len(), jobs.len());
        for job in &jobs {
            assert!(out.iter().any(|o| o.key() == job.key()));
        }
    }

    #[test]
    fn test_source_filter_partitions() {
        let jobs = vec![
            hit("1", Some("LinkedIn"), None, None, None),
            hit("2", Some("indeed"), None, None, None),
            hit("3", Some("company site"), None, None, None),
        ];
        let linkedin = process(&jobs, Some(Source::LinkedIn), SortOrder::Score);
        assert_eq!(linkedin.len(), 1);
        assert_eq!(linkedin[0].key(), "1");

        // Others is everything that matched no known board
        let others = process(&jobs, Some(Source::Other), SortOrder::Score);
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].key(), "3");
    }

    #[test]
    fn test_score_sort_descending_missing_as_zero() {
        let jobs = vec![
            hit("five", None, Some(5.0), None, None),
            hit("none", None, None, None, None),
            hit("nine", None, Some(9.0), None, None),
        ];
        let out = process(&jobs, None, SortOrder::Score);
        let keys: Vec<&str> = out.iter().map(|j| j.key()).collect();
        assert_eq!(keys, vec!["nine", "five", "none"]);
    }

    #[test]
    fn test_score_sort_is_stable_on_ties() {
        let jobs = vec![
            hit("a", None, Some(7.0), None, None),
            hit("b", None, Some(7.0), None, None),
            hit("c", None, Some(7.0), None, None),
        ];
        let out = process(&jobs, None, SortOrder::Score);
        let keys: Vec<&str> = out.iter().map(|j| j.key()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_company_sort_missing_first_case_insensitive() {
        let jobs = vec![
            hit("z", None, None, Some("Zeta"), None),
            hit("m", None, None, None, None),
            hit("a", None, None, Some("acme"), None),
        ];
        let out = process(&jobs, None, SortOrder::Company);
        let keys: Vec<&str> = out.iter().map(|j| j.key()).collect();
        // "" < "acme" < "zeta"
        assert_eq!(keys, vec!["m", "a", "z"]);
    }

    #[test]
    fn test_latest_sort_unparseable_dates_last() {
        let jobs = vec![
            hit("old", None, None, None, Some("2025-01-10T08:00:00")),
            hit("bad", None, None, None, Some("yesterday")),
            hit("new", None, None, None, Some("2025-06-01T08:00:00+00:00")),
            hit("missing", None, None, None, None),
        ];
        let out = process(&jobs, None, SortOrder::Latest);
        let keys: Vec<&str> = out.iter().map(|j| j.key()).collect();
        // bad and missing both parse to the floor and keep input order
        assert_eq!(keys, vec!["new", "old", "bad", "missing"]);
    }

    #[test]
    fn test_process_never_mutates_input() {
        let jobs = vec![
            hit("1", Some("LinkedIn"), Some(1.0), Some("Beta"), None),
            hit("2", Some("indeed"), Some(9.0), Some("Alpha"), None),
        ];
        let snapshot: Vec<String> = jobs.iter().map(|j| j.key().to_string()).collect();
        let _ = process(&jobs, Some(Source::LinkedIn), SortOrder::Company);
        let _ = process(&jobs, None, SortOrder::Score);
        let after: Vec<String> = jobs.iter().map(|j| j.key().to_string()).collect();
        assert_eq!(snapshot, after);
        assert_eq!(jobs[0].ai_score, Some(1.0));
    }
}
