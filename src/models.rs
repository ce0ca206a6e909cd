use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline stage of a tracked application. The service rejects anything
/// outside these four values, so they are the only ones representable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Applied,
    Inprocess,
    Rejected,
    Hired,
}

impl Stage {
    /// Board column order.
    pub const ALL: [Stage; 4] = [Stage::Applied, Stage::Inprocess, Stage::Rejected, Stage::Hired];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Applied => "applied",
            Stage::Inprocess => "inprocess",
            Stage::Rejected => "rejected",
            Stage::Hired => "hired",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Applied => "Applied",
            Stage::Inprocess => "In Process",
            Stage::Rejected => "Rejected",
            Stage::Hired => "Hired",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "applied" => Ok(Stage::Applied),
            "inprocess" | "in-process" => Ok(Stage::Inprocess),
            "rejected" => Ok(Stage::Rejected),
            "hired" => Ok(Stage::Hired),
            _ => Err(anyhow::anyhow!(
                "Unknown stage '{}'. Valid stages: applied, inprocess, rejected, hired",
                s
            )),
        }
    }
}

/// One job posting, either an ephemeral search hit or a record the user
/// tracks or saved. Search hits only carry `external_id`; once the service
/// knows the job it gets a stable `id`. Timestamps stay in wire format and
/// are parsed where needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub apply_url: Option<String>,
    #[serde(default)]
    pub posted_at: Option<String>,
    #[serde(default)]
    pub ai_score: Option<f64>,
    #[serde(default)]
    pub status: Option<Stage>,
    #[serde(default)]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub applied_at: Option<String>,
}

impl JobRecord {
    /// Stable identifier, falling back to the search-source id for hits the
    /// service has not assigned an id yet.
    pub fn key(&self) -> &str {
        self.id
            .as_deref()
            .or(self.external_id.as_deref())
            .unwrap_or("")
    }

    pub fn is_tracked(&self) -> bool {
        self.status.is_some()
    }

    pub fn is_saved_only(&self) -> bool {
        self.status.is_none() && self.saved_at.is_some()
    }
}

/// Per-stage counts computed by the service. Always refetched together with
/// the collection, never derived from it client-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateSummary {
    #[serde(default)]
    pub applied: u32,
    #[serde(default)]
    pub inprocess: u32,
    #[serde(default)]
    pub rejected: u32,
    #[serde(default)]
    pub hired: u32,
    #[serde(default)]
    pub saved: u32,
}

/// Advisory blurb the ranking service attaches to a result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    #[serde(default)]
    pub icon: Option<String>,
    pub tip: String,
}

/// One search submission's worth of results. Lives only as long as the view
/// showing it; never enters the managed collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultSet {
    pub jobs: Vec<JobRecord>,
    #[serde(default)]
    pub ai_tips: Vec<Tip>,
    #[serde(default)]
    pub from_cache: bool,
    #[serde(default)]
    pub total: u32,
}

/// Payload of the full-collection fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct MyJobsResponse {
    pub jobs: Vec<JobRecord>,
    pub summary: AggregateSummary,
}

#[cfg(test)]
pub fn test_record(id: &str, status: Option<Stage>, saved_at: Option<&str>) -> JobRecord {
    JobRecord {
        id: Some(id.to_string()),
        external_id: None,
        title: format!("Job {}", id),
        company: Some("Acme".to_string()),
        location: None,
        salary_range: None,
        description: None,
        source: None,
        apply_url: None,
        posted_at: None,
        ai_score: None,
        status,
        saved_at: saved_at.map(str::to_string),
        applied_at: None,
    }
}
