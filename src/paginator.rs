use crate::content::ContentItem;
use crate::error::{ApiError, FetchError};
use crate::session::Session;
use crate::twitter_client::api;
use crate::twitter_client::retry::RetryPolicy;
use crate::twitter_client::TwitterApi;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timeline {
    /// Tweets the user liked, most recently liked first.
    Liked,
    /// Tweets the user wrote, newest first.
    Authored,
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Liked => f.write_str("liked tweets"),
            Self::Authored => f.write_str("user tweets"),
        }
    }
}

/// Lazily walks `timeline` for `user_id`, one page at a time, in the order the API returns.
///
/// A page is requested only once every item of the previous one has been consumed, so
/// dropping the stream stops the walk. The walk ends on an empty page, a missing next
/// token, or a [FetchError] (yielded once, as the final item).
pub fn fetch<'a>(
    session: &'a Session,
    timeline: Timeline,
    user_id: &'a str,
    page_size: u32,
    retry: &'a RetryPolicy,
) -> BoxStream<'a, Result<ContentItem, FetchError>> {
    let walk = PageWalk {
        api: session.api(),
        timeline,
        user_id,
        page_size,
        retry,
        buffer: VecDeque::new(),
        next_token: None,
        pages_fetched: 0,
        finished: false,
    };
    stream::unfold(walk, |mut walk| async move {
        let item = walk.next_item().await?;
        Some((item, walk))
    })
    .boxed()
}

struct PageWalk<'a> {
    api: &'a dyn TwitterApi,
    timeline: Timeline,
    user_id: &'a str,
    page_size: u32,
    retry: &'a RetryPolicy,
    buffer: VecDeque<api::Tweet>,
    next_token: Option<String>,
    pages_fetched: usize,
    finished: bool,
}

impl<'a> PageWalk<'a> {
    async fn next_item(&mut self) -> Option<Result<ContentItem, FetchError>> {
        loop {
            if let Some(tweet) = self.buffer.pop_front() {
                return Some(Ok(tweet.into()));
            }
            if self.finished {
                return None;
            }

            let page = match self.fetch_page().await {
                Ok(page) => page,
                Err(err) => {
                    self.finished = true;
                    warn!(timeline = %self.timeline, error = %err, "error fetching page, stopping");
                    return Some(Err(err.into()));
                }
            };
            self.pages_fetched += 1;

            if !page.problems.is_empty() {
                self.finished = true;
                let problems: Vec<String> = page.problems.iter().map(|p| p.describe()).collect();
                warn!(
                    timeline = %self.timeline,
                    page = self.pages_fetched,
                    ?problems,
                    "error in pagination, stopping"
                );
                return Some(Err(FetchError::PageProblems(problems)));
            }

            debug!(
                timeline = %self.timeline,
                page = self.pages_fetched,
                items = page.tweets.len(),
                "fetched page"
            );
            if page.tweets.is_empty() {
                self.finished = true;
                return None;
            }
            self.finished = page.next_token.is_none();
            self.next_token = page.next_token;
            self.buffer.extend(page.tweets);
        }
    }

    async fn fetch_page(&self) -> Result<api::Page, ApiError> {
        let PageWalk {
            api,
            user_id,
            page_size,
            retry,
            ..
        } = *self;
        let token = self.next_token.as_deref();
        match self.timeline {
            Timeline::Liked => {
                retry
                    .run("liked_tweets", move || api.liked_tweets(user_id, page_size, token))
                    .await
            }
            Timeline::Authored => {
                retry
                    .run("users_tweets", move || api.users_tweets(user_id, page_size, token))
                    .await
            }
        }
    }
}
