use chrono::Utc;
use mailwatch::{
    config::AppConfig, engine, feeds::FeedFetcher, state::StateFile, tracker::GithubTracker,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(error) = run().await {
        error!(error = %error, "mailwatch run failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = AppConfig::from_env().map_err(|error| error.to_string())?;
    let tracker = GithubTracker::new(&config).map_err(|error| error.to_string())?;
    let fetcher = FeedFetcher::new(&config).map_err(|error| error.to_string())?;
    let state_file = StateFile::new(&config.state_path);

    let mut state = state_file.load();
    let repo = format!("{}/{}", config.repo_owner, config.repo_name);
    info!(repo = %repo, tracked = state.incidents.len(), "mailwatch pass started");

    let incidents = fetcher.collect_all().await;

    let summary = engine::reconcile(&mut state, &incidents, &tracker, Utc::now()).await;

    // Persist whatever progress was made, even if some incidents failed.
    state_file.save(&state).map_err(|error| error.to_string())?;

    info!(
        created = summary.created,
        recovered = summary.recovered,
        updated = summary.updated,
        closed = summary.closed,
        skipped = summary.skipped,
        failed = summary.failed,
        "mailwatch pass complete"
    );

    Ok(())
}
