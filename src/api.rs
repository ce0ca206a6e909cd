use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::models::{MyJobsResponse, SearchResultSet, Stage};

// --- Session credential ---

/// Bearer credential for the job service. Obtained out of band (the service
/// hands out tokens at login), stored under the platform data dir, and
/// passed explicitly into the API client rather than read from ambient
/// state. `JOBSCOUT_TOKEN` overrides the stored file.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
}

impl Session {
    pub fn load() -> Result<Self> {
        if let Ok(token) = env::var("JOBSCOUT_TOKEN") {
            if !token.trim().is_empty() {
                return Ok(Self { token: token.trim().to_string() });
            }
        }
        let path = Self::token_path()?;
        let token = fs::read_to_string(&path)
            .with_context(|| format!("Not logged in. Run 'jobscout login' first (no token at {})", path.display()))?;
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(anyhow!("Stored token is empty. Run 'jobscout login' again."));
        }
        Ok(Self { token })
    }

    pub fn store(token: &str) -> Result<PathBuf> {
        let path = Self::token_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, token.trim())
            .with_context(|| format!("Failed to write token to {}", path.display()))?;
        Ok(path)
    }

    pub fn clear() -> Result<bool> {
        let path = Self::token_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove token at {}", path.display()))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn token_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobscout") {
            Ok(proj_dirs.data_dir().join("token"))
        } else {
            Ok(PathBuf::from(".jobscout-token"))
        }
    }
}

pub fn base_url() -> String {
    env::var("JOBSCOUT_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

// --- Remote surface ---

/// Everything the client asks of the job service. Split out as a trait so
/// the transition logic can run against a recording fake in tests.
pub trait JobsApi {
    /// Full collection plus the server-computed summary.
    fn fetch_collection(&self) -> Result<MyJobsResponse>;
    fn search(&self, role: &str, experience: u32) -> Result<SearchResultSet>;
    fn update_status(&self, job_id: &str, stage: Stage) -> Result<()>;
    fn delete_tracked(&self, job_id: &str) -> Result<()>;
    fn delete_saved(&self, job_id: &str) -> Result<()>;
    /// Create a tracked application for a search hit.
    fn track(&self, job_id: &str) -> Result<()>;
    /// Bookmark a search hit without tracking it.
    fn save(&self, job_id: &str) -> Result<()>;
}

pub struct HttpJobsApi {
    base_url: String,
    session: Session,
    client: reqwest::blocking::Client,
}

impl HttpJobsApi {
    pub fn new(base_url: String, session: Session) -> Self {
        let client = reqwest::blocking::Client::new();
        Self { base_url, session, client }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(base_url(), Session::load()?))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Error out on non-2xx with the status and whatever body the service
    /// sent, which carries its `detail` message.
    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            Err(anyhow!("Job service request failed with status {}: {}", status, body))
        }
    }
}

impl JobsApi for HttpJobsApi {
    fn fetch_collection(&self) -> Result<MyJobsResponse> {
        let response = self
            .client
            .get(self.url("/jobs/my-jobs?filter=all"))
            .bearer_auth(&self.session.token)
            .send()
            .context("Failed to reach the job service")?;
        Self::check(response)?
            .json()
            .context("Failed to parse my-jobs response")
    }

    fn search(&self, role: &str, experience: u32) -> Result<SearchResultSet> {
        let response = self
            .client
            .get(self.url("/jobs/search"))
            .query(&[("role", role), ("experience", &experience.to_string())])
            .bearer_auth(&self.session.token)
            .send()
            .context("Failed to reach the job service")?;
        Self::check(response)?
            .json()
            .context("Failed to parse search response")
    }

    fn update_status(&self, job_id: &str, stage: Stage) -> Result<()> {
        let response = self
            .client
            .patch(self.url(&format!("/jobs/apply/{}/status", job_id)))
            .bearer_auth(&self.session.token)
            .json(&serde_json::json!({ "status": stage }))
            .send()
            .context("Failed to reach the job service")?;
        Self::check(response)?;
        Ok(())
    }

    fn delete_tracked(&self, job_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/jobs/apply/{}", job_id)))
            .bearer_auth(&self.session.token)
            .send()
            .context("Failed to reach the job service")?;
        Self::check(response)?;
        Ok(())
    }

    fn delete_saved(&self, job_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/jobs/save/{}", job_id)))
            .bearer_auth(&self.session.token)
            .send()
            .context("Failed to reach the job service")?;
        Self::check(response)?;
        Ok(())
    }

    fn track(&self, job_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/jobs/apply/{}", job_id)))
            .bearer_auth(&self.session.token)
            .send()
            .context("Failed to reach the job service")?;
        Self::check(response)?;
        Ok(())
    }

    fn save(&self, job_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/jobs/save/{}", job_id)))
            .bearer_auth(&self.session.token)
            .send()
            .context("Failed to reach the job service")?;
        Self::check(response)?;
        Ok(())
    }
}
