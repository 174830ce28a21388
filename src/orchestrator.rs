use crate::deletion::{Engine, RunResult, Settings};
use crate::error::Error;
use crate::selection::{DateRange, Selection};
use crate::session::Session;
use tracing::{info, warn};

/// Results of the jobs that ran; `None` for a job that wasn't selected (or was skipped
/// after a stop request).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub likes: Option<RunResult>,
    pub tweets: Option<RunResult>,
}

impl RunReport {
    pub fn log_summary(&self) {
        let jobs = [("likes", &self.likes), ("tweets", &self.tweets)];
        for (job, result) in jobs {
            let result = match result {
                Some(result) => result,
                None => continue,
            };
            info!(
                job,
                processed = result.processed,
                acted_on = result.acted_on,
                failed = result.failures.len(),
                "summary"
            );
            for failure in &result.failures {
                warn!(job, tweet_id = %failure.id, action = %failure.action, "failed: {}", failure.detail);
            }
            if let Some(fetch_error) = &result.fetch_error {
                warn!(job, "stopped early on a fetch error: {fetch_error}");
            }
            if result.interrupted {
                warn!(job, "interrupted before reaching the end");
            }
        }
    }
}

/// Runs the selected jobs one after the other: likes first, then the user's own tweets.
///
/// The caller's identity is re-resolved before anything is touched; if that fails nothing
/// runs. A failed or interrupted likes job does not undo anything, and only a stop request
/// keeps the tweets job from starting.
pub async fn run(
    session: &Session,
    selection: Selection,
    range: &DateRange,
    settings: &Settings,
) -> Result<RunReport, Error> {
    selection.validate()?;
    let identity = session.resolve_identity(&settings.retry).await?;
    info!(username = %identity.username, %range, ?selection, "starting deletion run");

    let engine = Engine::new(session, settings);
    let mut report = RunReport::default();

    if selection.contains(Selection::LIKES) {
        report.likes = Some(engine.delete_likes_in_range(&identity.user_id, range).await);
    }
    if selection.wants_tweets() && !settings.stop.is_stopped() {
        report.tweets = Some(
            engine
                .delete_user_content_by_type(&identity.user_id, range, selection)
                .await,
        );
    }

    info!("all selected deletion tasks finished");
    Ok(report)
}
