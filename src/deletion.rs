use crate::classify::{deletion_target, Category};
use crate::config::Config;
use crate::content::ContentItem;
use crate::error::{ApiError, FetchError};
use crate::paginator::{fetch, Timeline};
use crate::selection::{DateRange, Selection};
use crate::session::Session;
use crate::twitter_client::retry::RetryPolicy;
use futures_util::StreamExt;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Cooperative stop flag, checked between items. A call already sent is never abandoned.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Requests a stop. Returns true if one had already been requested.
    pub fn interrupt(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Unlike,
    Delete(Category),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlike => f.write_str("unlike"),
            Self::Delete(category) => write!(f, "delete {category}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemFailure {
    pub id: String,
    pub action: Action,
    pub detail: String,
}

/// Outcome of one job. `processed` counts every item scanned, `acted_on` only successful
/// unlike/delete calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunResult {
    pub processed: usize,
    pub acted_on: usize,
    pub failures: Vec<ItemFailure>,
    /// Set when the page walk ended on an error rather than running out of data.
    pub fetch_error: Option<String>,
    /// Set when an authored item older than the range ended the walk.
    pub reached_range_start: bool,
    pub interrupted: bool,
}

impl RunResult {
    fn record_failure(&mut self, id: &str, action: Action, err: ApiError) {
        match err.hint() {
            Some(hint) => error!(tweet_id = %id, %action, error = %err, hint, "could not {action}"),
            None => error!(tweet_id = %id, %action, error = %err, "could not {action}"),
        }
        self.failures.push(ItemFailure {
            id: id.to_string(),
            action,
            detail: err.to_string(),
        });
    }

    fn record_fetch_error(&mut self, timeline: Timeline, err: FetchError) {
        warn!(%timeline, error = %err, "stopped reading {timeline}; results are partial");
        self.fetch_error = Some(err.to_string());
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub page_size: u32,
    pub retry: RetryPolicy,
    pub stop: StopSignal,
}

impl Settings {
    pub fn from_config(config: &Config, stop: StopSignal) -> Self {
        Self {
            page_size: config.page_size,
            retry: config.retry.clone(),
            stop,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default(), StopSignal::default())
    }
}

pub struct Engine<'a> {
    session: &'a Session,
    settings: &'a Settings,
}

impl<'a> Engine<'a> {
    pub fn new(session: &'a Session, settings: &'a Settings) -> Self {
        Self { session, settings }
    }

    /// Unlikes every liked tweet whose creation time falls in `range`.
    ///
    /// Liked tweets come back in like order, not creation order, so the whole timeline is
    /// scanned; an old tweet says nothing about the ones after it.
    pub async fn delete_likes_in_range(&self, user_id: &str, range: &DateRange) -> RunResult {
        info!(%range, "starting to delete likes (based on tweet creation date)");
        let api = self.session.api();
        let retry = &self.settings.retry;
        let mut result = RunResult::default();
        let mut items = fetch(
            self.session,
            Timeline::Liked,
            user_id,
            self.settings.page_size,
            retry,
        );

        while let Some(item) = self.next_item(&mut items, &mut result).await {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    result.record_fetch_error(Timeline::Liked, err);
                    break;
                }
            };
            result.processed += 1;

            let created_at = match item.created_at {
                Some(created_at) if range.contains(created_at) => created_at,
                _ => continue,
            };

            info!(tweet_id = %item.id, %created_at, "unliking tweet");
            let tweet_id = item.id.as_str();
            match retry
                .run("unlike", move || api.unlike(user_id, tweet_id))
                .await
            {
                Ok(()) => result.acted_on += 1,
                Err(err) => result.record_failure(tweet_id, Action::Unlike, err),
            }
        }

        info!(
            processed = result.processed,
            failed = result.failures.len(),
            "finished deleting likes. total unliked: {}",
            result.acted_on
        );
        result
    }

    /// Deletes the user's own tweets in `range` whose kind is in `selection`.
    ///
    /// The user timeline is newest first, so the first tweet older than the range ends the
    /// walk without fetching further pages. Retweets are always left alone.
    pub async fn delete_user_content_by_type(
        &self,
        user_id: &str,
        range: &DateRange,
        selection: Selection,
    ) -> RunResult {
        info!(%range, ?selection, "starting to delete user's tweets based on selection");
        let api = self.session.api();
        let retry = &self.settings.retry;
        let mut result = RunResult::default();
        let mut items = fetch(
            self.session,
            Timeline::Authored,
            user_id,
            self.settings.page_size,
            retry,
        );

        while let Some(item) = self.next_item(&mut items, &mut result).await {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    result.record_fetch_error(Timeline::Authored, err);
                    break;
                }
            };
            result.processed += 1;

            let created_at = match item.created_at {
                Some(created_at) => created_at,
                None => {
                    debug!(tweet_id = %item.id, "skipping tweet without creation time");
                    continue;
                }
            };
            if range.is_before_start(created_at) {
                info!(tweet_id = %item.id, %created_at, "reached tweets older than the range, stopping");
                result.reached_range_start = true;
                break;
            }
            if range.is_after_end(created_at) {
                continue;
            }

            let category = match deletion_target(&item, selection) {
                Some(category) => category,
                None => continue,
            };

            info!(tweet_id = %item.id, %created_at, "deleting {category}");
            let tweet_id = item.id.as_str();
            match retry
                .run("delete_tweet", move || api.delete_tweet(tweet_id))
                .await
            {
                Ok(()) => result.acted_on += 1,
                Err(err) => result.record_failure(tweet_id, Action::Delete(category), err),
            }
        }

        info!(
            processed = result.processed,
            failed = result.failures.len(),
            "finished deleting user tweets. total deleted: {}",
            result.acted_on
        );
        result
    }

    // Checks the stop signal before pulling, so no page is requested after a stop.
    async fn next_item<S>(&self, items: &mut S, result: &mut RunResult) -> Option<S::Item>
    where
        S: futures_util::Stream<Item = Result<ContentItem, FetchError>> + Unpin,
    {
        if self.settings.stop.is_stopped() {
            warn!("stop requested, ending job early");
            result.interrupted = true;
            return None;
        }
        items.next().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitter_client::api::Tweet;
    use crate::twitter_client::fake::{self, session, Call, FakeApi};

    fn january() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-31").unwrap()
    }

    fn fast_settings() -> Settings {
        Settings {
            retry: RetryPolicy {
                initial_delay_ms: 1,
                max_delay_ms: 1,
                rate_limit_wait_ms: 1,
                ..RetryPolicy::default()
            },
            ..Settings::default()
        }
    }

    fn deleted(fake: &FakeApi) -> Vec<String> {
        fake.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::DeleteTweet(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn unliked(fake: &FakeApi) -> Vec<String> {
        fake.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Unlike(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    async fn run_likes(fake: FakeApi) -> (Arc<FakeApi>, RunResult) {
        let fake = Arc::new(fake);
        let session = session(&fake).await;
        let settings = fast_settings();
        let result = Engine::new(&session, &settings)
            .delete_likes_in_range("1001", &january())
            .await;
        (fake, result)
    }

    async fn run_tweets(fake: FakeApi, selection: Selection) -> (Arc<FakeApi>, RunResult) {
        let fake = Arc::new(fake);
        let session = session(&fake).await;
        let settings = fast_settings();
        let result = Engine::new(&session, &settings)
            .delete_user_content_by_type("1001", &january(), selection)
            .await;
        (fake, result)
    }

    #[test]
    fn test_repeated_interrupt_is_reported() {
        let stop = StopSignal::default();
        let handler_copy = stop.clone();
        assert!(!handler_copy.interrupt());
        assert!(stop.is_stopped());
        assert!(handler_copy.interrupt());
    }

    #[tokio::test]
    async fn test_likes_scan_past_old_tweets() {
        let (fake, result) = run_likes(FakeApi::new().with_liked(vec![
            vec![
                fake::post("a", "2024-02-10T00:00:00Z"),
                fake::post("b", "2024-01-20T00:00:00Z"),
                fake::post("c", "2023-06-01T00:00:00Z"),
            ],
            vec![
                fake::post("d", "2024-01-01T00:00:00Z"),
                fake::post("e", "2022-01-01T00:00:00Z"),
            ],
        ]))
        .await;

        assert_eq!(unliked(&fake), vec!["b", "d"]);
        assert_eq!(result.processed, 5);
        assert_eq!(result.acted_on, 2);
        assert!(result.failures.is_empty());
        assert_eq!(fake.count(|c| matches!(c, Call::LikedTweets(_))), 2);
    }

    #[tokio::test]
    async fn test_likes_rerun_is_a_no_op() {
        let (fake, result) = run_likes(FakeApi::new().with_liked(vec![vec![
            fake::post("a", "2024-02-10T00:00:00Z"),
            fake::post("b", "2023-12-31T23:59:59Z"),
        ]]))
        .await;

        assert!(unliked(&fake).is_empty());
        assert_eq!(
            result,
            RunResult {
                processed: 2,
                ..RunResult::default()
            }
        );
    }

    #[tokio::test]
    async fn test_unlike_failure_does_not_abort() {
        let (fake, result) = run_likes(
            FakeApi::new()
                .with_liked(vec![vec![
                    fake::post("a", "2024-01-20T00:00:00Z"),
                    fake::post("b", "2024-01-10T00:00:00Z"),
                ]])
                .failing("a", 404),
        )
        .await;

        assert_eq!(unliked(&fake), vec!["a", "b"]);
        assert_eq!(result.processed, 2);
        assert_eq!(result.acted_on, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].id, "a");
        assert_eq!(result.failures[0].action, Action::Unlike);
    }

    #[tokio::test]
    async fn test_early_stop_on_older_tweet() {
        let (fake, result) = run_tweets(
            FakeApi::new().with_authored(vec![
                vec![
                    fake::post("1", "2024-02-02T00:00:00Z"),
                    fake::post("2", "2024-01-15T00:00:00Z"),
                    fake::post("3", "2023-12-31T23:59:59Z"),
                    fake::post("4", "2023-12-30T00:00:00Z"),
                ],
                vec![fake::post("5", "2023-12-01T00:00:00Z")],
            ]),
            Selection::POSTS,
        )
        .await;

        assert_eq!(deleted(&fake), vec!["2"]);
        assert_eq!(result.processed, 3);
        assert!(result.reached_range_start);
        assert_eq!(fake.count(|c| matches!(c, Call::UsersTweets(_))), 1);
    }

    #[tokio::test]
    async fn test_early_stop_does_not_fetch_next_page() {
        let (fake, result) = run_tweets(
            FakeApi::new().with_authored(vec![
                vec![fake::post("1", "2024-01-15T00:00:00Z")],
                vec![fake::post("2", "2023-01-15T00:00:00Z")],
                vec![fake::post("3", "2024-01-10T00:00:00Z")],
            ]),
            Selection::POSTS,
        )
        .await;

        assert_eq!(deleted(&fake), vec!["1"]);
        assert_eq!(result.processed, 2);
        assert_eq!(fake.count(|c| matches!(c, Call::UsersTweets(_))), 2);
    }

    #[tokio::test]
    async fn test_reply_and_quote_deleted_once_as_reply() {
        let mut both = fake::quote("rq", "2024-01-15T00:00:00Z");
        both.in_reply_to_user_id = Some(String::from("42"));
        let (fake, result) = run_tweets(
            FakeApi::new().with_authored(vec![vec![both]]),
            Selection::REPLIES | Selection::QUOTES,
        )
        .await;

        assert_eq!(deleted(&fake), vec!["rq"]);
        assert_eq!(result.acted_on, 1);
    }

    #[tokio::test]
    async fn test_only_replies_selected() {
        let (fake, result) = run_tweets(
            FakeApi::new().with_authored(vec![vec![
                fake::post("own", "2024-01-20T00:00:00Z"),
                fake::reply("re", "2024-01-15T00:00:00Z"),
            ]]),
            Selection::from_flags(false, true, false, false),
        )
        .await;

        assert_eq!(deleted(&fake), vec!["re"]);
        assert_eq!(result.acted_on, 1);
        assert_eq!(result.processed, 2);
    }

    #[tokio::test]
    async fn test_retweets_are_never_deleted() {
        let tweets: Vec<Tweet> = vec![
            fake::retweet("rt", "2024-01-20T00:00:00Z"),
            fake::quote("q", "2024-01-19T00:00:00Z"),
            fake::post("p", "2024-01-18T00:00:00Z"),
        ];
        let (fake, result) =
            run_tweets(FakeApi::new().with_authored(vec![tweets]), Selection::all()).await;

        assert_eq!(deleted(&fake), vec!["q", "p"]);
        assert_eq!(result.acted_on, 2);
        assert_eq!(result.processed, 3);
    }

    #[tokio::test]
    async fn test_delete_failure_is_recorded_and_run_continues() {
        let (fake, result) = run_tweets(
            FakeApi::new()
                .with_authored(vec![vec![
                    fake::reply("r1", "2024-01-20T00:00:00Z"),
                    fake::reply("r2", "2024-01-19T00:00:00Z"),
                ]])
                .failing("r1", 403),
            Selection::REPLIES,
        )
        .await;

        assert_eq!(deleted(&fake), vec!["r1", "r2"]);
        assert_eq!(result.acted_on, 1);
        assert_eq!(
            result.failures,
            vec![ItemFailure {
                id: String::from("r1"),
                action: Action::Delete(Category::Reply),
                detail: String::from("Twitter API error 403 Forbidden: fake failure"),
            }]
        );
    }

    #[tokio::test]
    async fn test_page_problem_keeps_partial_results() {
        let (fake, result) = run_tweets(
            FakeApi::new()
                .with_authored(vec![
                    vec![fake::post("1", "2024-01-20T00:00:00Z")],
                    vec![fake::post("2", "2024-01-19T00:00:00Z")],
                ])
                .with_authored_problem(1, "Internal error"),
            Selection::POSTS,
        )
        .await;

        assert_eq!(deleted(&fake), vec!["1"]);
        assert_eq!(result.acted_on, 1);
        assert!(result.fetch_error.is_some());
    }

    #[tokio::test]
    async fn test_stop_signal_ends_job_before_fetching() {
        let fake = Arc::new(
            FakeApi::new().with_authored(vec![vec![fake::post("1", "2024-01-20T00:00:00Z")]]),
        );
        let session = session(&fake).await;
        let settings = fast_settings();
        settings.stop.stop();

        let result = Engine::new(&session, &settings)
            .delete_user_content_by_type("1001", &january(), Selection::all())
            .await;

        assert!(result.interrupted);
        assert_eq!(result.processed, 0);
        assert_eq!(fake.calls(), vec![Call::Me]);
    }
}
