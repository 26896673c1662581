use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use jobboard_client::guard::{MemoryNavigator, NavigationDecision, Navigator, RouteWhitelist};
use jobboard_client::services::{bookmarks, jobs};
use jobboard_client::{ApiError, ClientConfig, ConfigError, JobBoardClient};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("api request failed: {0}")]
    Api(#[from] ApiError),
    #[error("no session; pass --user-id or sign in through the refresh cookie first")]
    NoSession,
    #[error("invalid filter `{0}`; expected key=value")]
    InvalidFilter(String),
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "jobboard", about = "Job board API client with session refresh")]
struct Cli {
    /// Overrides `JOBBOARD_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Sign in through the testing login endpoint before running the command.
    #[arg(long, env = "JOBBOARD_TEST_USER_ID")]
    user_id: Option<String>,

    /// Route the simulated browser starts on.
    #[arg(long, default_value = "/")]
    path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with the testing login endpoint and print the session.
    Login { user_id: String },
    /// Attempt one silent refresh and print the resulting session.
    Restore,
    /// GET an arbitrary API path through the refreshing client.
    Get { path: String },
    Jobs(JobsCommand),
    Bookmarks(BookmarksCommand),
    /// Report whether a route is public and where navigation would land.
    Whitelist { path: String },
}

#[derive(Args, Debug)]
struct JobsCommand {
    #[command(subcommand)]
    command: JobsSubcommand,
}

#[derive(Subcommand, Debug)]
enum JobsSubcommand {
    List {
        /// Repeatable `key=value` filter, e.g. `--filter location=Remote`.
        #[arg(long = "filter")]
        filters: Vec<String>,
    },
    Get {
        job_id: String,
    },
}

#[derive(Args, Debug)]
struct BookmarksCommand {
    #[command(subcommand)]
    command: BookmarksSubcommand,
}

#[derive(Subcommand, Debug)]
enum BookmarksSubcommand {
    List,
    Add { job_id: String },
    Remove { job_id: String },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    let result = run(Cli::parse()).await;
    if let Err(CliError::Api(err)) = &result {
        if err.retryable() {
            tracing::warn!(error = %err, "transient failure; rerunning the command may succeed");
        }
    }
    result
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    let navigator = Arc::new(MemoryNavigator::new(cli.path));
    let client = JobBoardClient::new(config, navigator.clone())?;

    if let Some(user_id) = &cli.user_id {
        client.api().testing_login(user_id).await?;
    }

    match cli.command {
        Command::Login { user_id } => {
            client.api().testing_login(&user_id).await?;
            print_session(&client, navigator.as_ref())
        }
        Command::Restore => {
            let restored = client.restore_session_on_load().await;
            tracing::info!(restored, "startup restore finished");
            print_session(&client, navigator.as_ref())
        }
        Command::Get { path } => {
            let json: Value = client.api().get_json(&path).await?;
            print_json(&json)
        }
        Command::Jobs(jobs) => run_jobs(&client, jobs).await,
        Command::Bookmarks(bookmarks) => run_bookmarks(&client, bookmarks).await,
        Command::Whitelist { path } => {
            let decision = match client.guard().check_navigation(&path) {
                NavigationDecision::Allow => Value::Null,
                NavigationDecision::Redirect(target) => Value::String(target),
            };
            print_json(&serde_json::json!({
                "path": path,
                "whitelisted": client.guard().is_route_whitelisted(&path),
                "redirect": decision,
                "defaults": whitelist_json(&RouteWhitelist::default()),
            }))
        }
    }
}

async fn run_jobs(client: &JobBoardClient, jobs: JobsCommand) -> Result<(), CliError> {
    match jobs.command {
        JobsSubcommand::List { filters } => {
            let pairs = filters.iter().map(|raw| parse_filter(raw)).collect::<Result<Vec<_>, _>>()?;
            let list = jobs::list_jobs(client.api(), &pairs).await?;
            print_json(&serde_json::to_value(list)?)
        }
        JobsSubcommand::Get { job_id } => {
            let job = jobs::fetch_job(client.api(), &job_id).await?.ok_or(CliError::JobNotFound(job_id))?;
            print_json(&serde_json::to_value(job)?)
        }
    }
}

async fn run_bookmarks(client: &JobBoardClient, bookmarks: BookmarksCommand) -> Result<(), CliError> {
    require_session(client)?;
    match bookmarks.command {
        BookmarksSubcommand::List => {
            let ids = bookmarks::fetch_bookmark_ids(client.api()).await?;
            print_json(&serde_json::to_value(ids)?)
        }
        BookmarksSubcommand::Add { job_id } => {
            bookmarks::add_bookmark(client.api(), &job_id).await?;
            println!("ok");
            Ok(())
        }
        BookmarksSubcommand::Remove { job_id } => {
            bookmarks::remove_bookmark(client.api(), &job_id).await?;
            println!("ok");
            Ok(())
        }
    }
}

fn require_session(client: &JobBoardClient) -> Result<(), CliError> {
    if client.session().is_authenticated() { Ok(()) } else { Err(CliError::NoSession) }
}

fn parse_filter(raw: &str) -> Result<(&str, &str), CliError> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| CliError::InvalidFilter(raw.to_owned()))
}

fn whitelist_json(whitelist: &RouteWhitelist) -> Value {
    serde_json::json!({ "exact": whitelist.exact, "prefixes": whitelist.prefixes })
}

fn print_session(client: &JobBoardClient, navigator: &dyn Navigator) -> Result<(), CliError> {
    let session = client.session().snapshot();
    print_json(&serde_json::json!({
        "authenticated": session.is_authenticated(),
        "username": session.username,
        "role": session.role.map(|r| r.as_str()),
        "user_id": session.user_id,
        "redirect_path": session.redirect_path(),
        "current_path": navigator.current_path(),
    }))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
