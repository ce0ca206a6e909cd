mod api;
mod controller;
mod models;
mod progress;
mod search;
mod store;
mod tui;
mod views;

use anyhow::{anyhow, Result};
use api::{HttpJobsApi, JobsApi, Session};
use clap::{Parser, Subcommand};
use models::Stage;
use progress::{ProgressTicker, SearchTask};
use search::{SortOrder, Source};
use std::io::{IsTerminal, Read, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use store::JobCollectionStore;

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "AI job search client - find roles, track applications, work the pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the service token for this machine
    Login {
        /// Token issued by the job service; prompted for if omitted
        token: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Search for jobs and browse the ranked results
    Search {
        /// Role to search for, e.g. "React Developer"
        role: String,

        /// Years of experience
        #[arg(short, long, default_value = "0")]
        experience: u32,

        /// Sort order (score, latest, company)
        #[arg(short, long, default_value = "score")]
        sort: String,

        /// Only show one source (linkedin, indeed, glassdoor, others)
        #[arg(long)]
        source: Option<String>,

        /// Print a plain table instead of opening the browser UI
        #[arg(long)]
        table: bool,
    },

    /// Open the application board (kanban / table / saved)
    Board,

    /// List tracked applications
    List {
        /// Filter by stage (applied, inprocess, rejected, hired)
        #[arg(short, long)]
        stage: Option<String>,
    },

    /// List saved (bookmarked, not yet tracked) jobs
    Saved,

    /// Show your application overview
    Stats,

    /// Move an application to a pipeline stage
    SetStatus {
        /// Job ID
        id: String,

        /// Target stage (applied, inprocess, rejected, hired)
        stage: String,
    },

    /// Remove a tracked application or saved job
    Delete {
        /// Job ID
        id: String,

        /// The record is a saved bookmark, not a tracked application
        #[arg(long)]
        saved: bool,
    },

    /// Start tracking a job from a search result
    Track {
        /// Job ID (or search result ID)
        id: String,
    },

    /// Bookmark a job without tracking it
    Save {
        /// Job ID (or search result ID)
        id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Login { token } => {
            let token = match token {
                Some(t) => t,
                None => prompt_for_token()?,
            };
            if token.trim().is_empty() {
                return Err(anyhow!("Token is empty"));
            }
            let path = Session::store(&token)?;
            println!("Logged in. Token stored at {}", path.display());
        }

        Commands::Logout => {
            if Session::clear()? {
                println!("Logged out.");
            } else {
                println!("No stored session.");
            }
        }

        Commands::Search { role, experience, sort, source, table } => {
            // Validation never reaches the network
            if role.trim().is_empty() {
                return Err(anyhow!("Please enter a role to search for"));
            }
            let sort = SortOrder::from_str(&sort)?;
            let filter = source.as_deref().map(Source::from_str).transpose()?;

            let api = Arc::new(HttpJobsApi::from_env()?);
            let results = run_search_with_progress(Arc::clone(&api), role.clone(), experience)?;
            println!("Found {} jobs for '{}'", results.total, role);

            if table {
                print_results_table(&results.jobs, filter, sort);
            } else {
                tui::run_results(api.as_ref(), results, filter, sort)?;
            }
        }

        Commands::Board => {
            let api = HttpJobsApi::from_env()?;
            tui::run_board(&api)?;
        }

        Commands::List { stage } => {
            let stage = stage.as_deref().map(Stage::from_str).transpose()?;
            let api = HttpJobsApi::from_env()?;
            let mut store = JobCollectionStore::new();
            store.reload(&api)?;

            let rows = match stage {
                Some(s) => views::by_stage(store.jobs(), s),
                None => views::tracked_table(store.jobs()),
            };
            if rows.is_empty() {
                println!("No tracked applications.");
            } else {
                println!("{:<10} {:<12} {:<34} {:<22} {:<12}", "ID", "STAGE", "TITLE", "COMPANY", "APPLIED");
                println!("{}", "-".repeat(92));
                for job in rows {
                    println!(
                        "{:<10} {:<12} {:<34} {:<22} {:<12}",
                        truncate(job.key(), 8),
                        job.status.map(|s| s.as_str()).unwrap_or("-"),
                        truncate(&job.title, 32),
                        truncate(job.company.as_deref().unwrap_or("-"), 20),
                        truncate(job.applied_at.as_deref().unwrap_or("-"), 10),
                    );
                }
            }
        }

        Commands::Saved => {
            let api = HttpJobsApi::from_env()?;
            let mut store = JobCollectionStore::new();
            store.reload(&api)?;

            let rows = views::saved_only(store.jobs());
            if rows.is_empty() {
                println!("No saved jobs.");
            } else {
                println!("{:<10} {:<40} {:<22} {:<12}", "ID", "TITLE", "COMPANY", "SAVED");
                println!("{}", "-".repeat(86));
                for job in rows {
                    println!(
                        "{:<10} {:<40} {:<22} {:<12}",
                        truncate(job.key(), 8),
                        truncate(&job.title, 38),
                        truncate(job.company.as_deref().unwrap_or("-"), 20),
                        truncate(job.saved_at.as_deref().unwrap_or("-"), 10),
                    );
                }
            }
        }

        Commands::Stats => {
            let api = HttpJobsApi::from_env()?;
            let mut store = JobCollectionStore::new();
            store.reload(&api)?;

            let summary = store.summary();
            println!("Your Application Overview");
            println!("  Applied:    {}", summary.applied);
            println!("  In Process: {}", summary.inprocess);
            println!("  Rejected:   {}", summary.rejected);
            println!("  Hired:      {}", summary.hired);
            println!("  Saved:      {}", summary.saved);
        }

        Commands::SetStatus { id, stage } => {
            let stage = Stage::from_str(&stage)?;
            let api = HttpJobsApi::from_env()?;
            let mut store = JobCollectionStore::new();
            store.reload(&api)?;

            if store.get(&id).is_none() {
                return Err(anyhow!("No tracked or saved job with ID '{}'", id));
            }
            match controller::request_transition(&api, &mut store, &id, stage)? {
                controller::TransitionOutcome::Unchanged => {
                    println!("Job {} is already {}.", id, stage);
                }
                controller::TransitionOutcome::Updated => {
                    println!("Job {} moved to {}.", id, stage);
                }
            }
        }

        Commands::Delete { id, saved } => {
            let api = HttpJobsApi::from_env()?;
            let mut store = JobCollectionStore::new();
            store.reload(&api)?;

            controller::request_deletion(&api, &mut store, &id, saved)?;
            println!("Job {} removed.", id);
        }

        Commands::Track { id } => {
            let api = HttpJobsApi::from_env()?;
            api.track(&id)?;
            println!("Application tracked. See it with 'jobscout board'.");
        }

        Commands::Save { id } => {
            let api = HttpJobsApi::from_env()?;
            api.save(&id)?;
            println!("Job saved for later.");
        }
    }

    Ok(())
}

fn prompt_for_token() -> Result<String> {
    let mut input = String::new();
    if std::io::stdin().is_terminal() {
        eprint!("Paste your job service token: ");
        std::io::stderr().flush()?;
        std::io::stdin().read_line(&mut input)?;
    } else {
        std::io::stdin().read_to_string(&mut input)?;
    }
    Ok(input.trim().to_string())
}

/// Submit the search on a worker thread and narrate progress on stderr
/// while polling for the outcome. The ticker dies with this function, and a
/// result arriving after an interrupt has no receiver to land on.
fn run_search_with_progress(
    api: Arc<HttpJobsApi>,
    role: String,
    experience: u32,
) -> Result<models::SearchResultSet> {
    let task = SearchTask::spawn(move || api.search(&role, experience));
    let ticker = ProgressTicker::start();

    let mut last_shown = usize::MAX;
    loop {
        if let Some(outcome) = task.poll() {
            eprintln!();
            return outcome;
        }
        let index = ticker.current_index();
        if index != last_shown {
            eprintln!("  {}", ticker.current_message());
            last_shown = index;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn print_results_table(jobs: &[models::JobRecord], filter: Option<Source>, sort: SortOrder) {
    let rows = search::process(jobs, filter, sort);
    if rows.is_empty() {
        println!("No jobs found. Try adjusting the filter or searching another role.");
        return;
    }
    println!("{:<6} {:<10} {:<34} {:<22} {:<12}", "SCORE", "SOURCE", "TITLE", "COMPANY", "ID");
    println!("{}", "-".repeat(88));
    for job in &rows {
        let score = job
            .ai_score
            .map(|s| format!("{:.0}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<10} {:<34} {:<22} {:<12}",
            score,
            search::classify(job.source.as_deref()),
            truncate(&job.title, 32),
            truncate(job.company.as_deref().unwrap_or("-"), 20),
            truncate(job.key(), 10),
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
