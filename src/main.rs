use anyhow::{Context, Result};
use chrono::{Duration, Local};
use clap::Parser;
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use std::process;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tweet_purge::config::Config;
use tweet_purge::credentials::Credentials;
use tweet_purge::deletion::{Settings, StopSignal};
use tweet_purge::orchestrator;
use tweet_purge::selection::{parse_date, DateRange, Selection};
use tweet_purge::session::Session;

/// Bulk-remove your own likes and tweets created within a date range.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// First day to clean up, YYYY-MM-DD (default: 30 days ago)
    #[arg(long)]
    since: Option<String>,

    /// Last day to clean up, inclusive, YYYY-MM-DD (default: today)
    #[arg(long)]
    until: Option<String>,

    /// Unlike tweets created in the range
    #[arg(long)]
    likes: bool,

    /// Delete my replies
    #[arg(long)]
    replies: bool,

    /// Delete my own original posts
    #[arg(long)]
    posts: bool,

    /// Delete my quote tweets
    #[arg(long)]
    quotes: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// File holding API_KEY, API_SECRET, ACCESS_TOKEN and ACCESS_TOKEN_SECRET
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Optional JSON config (api_url, page_size, mutations_per_minute, retry)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Everything that can be checked locally is checked before we authenticate.
    let today = Local::now().date_naive();
    let since = match &args.since {
        Some(since) => parse_date(since)?,
        None => today - Duration::days(30),
    };
    let until = match &args.until {
        Some(until) => parse_date(until)?,
        None => today,
    };
    let range = DateRange::from_dates(since, until)?;
    let selection = Selection::from_flags(args.likes, args.replies, args.posts, args.quotes);
    selection.validate()?;

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let credentials = Credentials::load(&args.env_file)
        .with_context(|| format!("loading credentials from {}", args.env_file.display()))?;
    let session = Session::connect(&credentials, &config)
        .await
        .context("Failed to authenticate with Twitter. Check the logs and your .env file")?;

    if !args.yes && !confirm(&range)? {
        info!("deletion cancelled by user");
        return Ok(());
    }

    let stop = StopSignal::default();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            if stop.interrupt() {
                warn!("second interrupt, exiting now");
                process::exit(130);
            }
            warn!("interrupt received, stopping after the current item (Ctrl-C again to exit now)");
        })?;
    }

    let settings = Settings::from_config(&config, stop);
    let report = orchestrator::run(&session, selection, &range, &settings).await?;
    report.log_summary();
    Ok(())
}

fn confirm(range: &DateRange) -> Result<bool> {
    print!("Delete the selected content from {range}? This action is IRREVERSIBLE. [y/N] ");
    stdout().flush()?;
    let mut answer = String::new();
    stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
