//! In-memory [TwitterApi] for tests. Records every call it receives.

use super::api::{self, Page, Problem, Tweet, TweetReference, User};
use super::retry::RetryPolicy;
use super::TwitterApi;
use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Me,
    LikedTweets(Option<String>),
    UsersTweets(Option<String>),
    Unlike(String),
    DeleteTweet(String),
}

#[derive(Default)]
pub struct FakeApi {
    user: Option<User>,
    me_status: Option<u16>,
    me_throttled: Mutex<u32>,
    liked: Vec<Page>,
    authored: Vec<Page>,
    failures: HashMap<String, u16>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            user: Some(User {
                id: String::from("1001"),
                name: String::from("Test User"),
                username: String::from("test_user"),
            }),
            ..Default::default()
        }
    }

    /// `me` answers 200 with an `errors` payload and no data.
    pub fn without_user(self) -> Self {
        Self { user: None, ..self }
    }

    pub fn with_me_status(self, status: u16) -> Self {
        Self {
            me_status: Some(status),
            ..self
        }
    }

    /// `me` answers 429 for the first `times` calls.
    pub fn with_me_throttled(self, times: u32) -> Self {
        Self {
            me_throttled: Mutex::new(times),
            ..self
        }
    }

    pub fn with_liked(self, pages: Vec<Vec<Tweet>>) -> Self {
        Self {
            liked: paginate(pages),
            ..self
        }
    }

    pub fn with_authored(self, pages: Vec<Vec<Tweet>>) -> Self {
        Self {
            authored: paginate(pages),
            ..self
        }
    }

    pub fn with_authored_problem(mut self, page: usize, detail: &str) -> Self {
        self.authored[page].problems.push(Problem {
            detail: Some(detail.to_string()),
            ..Default::default()
        });
        self
    }

    pub fn failing(mut self, tweet_id: &str, status: u16) -> Self {
        self.failures.insert(tweet_id.to_string(), status);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_failure(&self, tweet_id: &str) -> Result<(), ApiError> {
        match self.failures.get(tweet_id) {
            Some(&status) => Err(status_error(status)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TwitterApi for FakeApi {
    async fn me(&self) -> Result<api::Response<User>, ApiError> {
        self.record(Call::Me);
        {
            let mut throttled = self.me_throttled.lock().unwrap();
            if *throttled > 0 {
                *throttled -= 1;
                return Err(ApiError::Status {
                    status: 429,
                    reason: String::from("Too Many Requests"),
                    detail: String::from("fake failure"),
                    retry_after: Some(Duration::from_millis(1)),
                });
            }
        }
        if let Some(status) = self.me_status {
            return Err(status_error(status));
        }
        Ok(match &self.user {
            Some(user) => api::Response {
                data: Some(user.clone()),
                meta: None,
                errors: None,
            },
            None => api::Response {
                data: None,
                meta: None,
                errors: Some(vec![Problem {
                    title: Some(String::from("Unauthorized")),
                    ..Default::default()
                }]),
            },
        })
    }

    async fn liked_tweets(
        &self,
        _user_id: &str,
        _max_results: u32,
        pagination_token: Option<&str>,
    ) -> Result<Page, ApiError> {
        self.record(Call::LikedTweets(pagination_token.map(String::from)));
        Ok(page_at(&self.liked, pagination_token))
    }

    async fn users_tweets(
        &self,
        _user_id: &str,
        _max_results: u32,
        pagination_token: Option<&str>,
    ) -> Result<Page, ApiError> {
        self.record(Call::UsersTweets(pagination_token.map(String::from)));
        Ok(page_at(&self.authored, pagination_token))
    }

    async fn unlike(&self, _user_id: &str, tweet_id: &str) -> Result<(), ApiError> {
        self.record(Call::Unlike(tweet_id.to_string()));
        self.check_failure(tweet_id)
    }

    async fn delete_tweet(&self, tweet_id: &str) -> Result<(), ApiError> {
        self.record(Call::DeleteTweet(tweet_id.to_string()));
        self.check_failure(tweet_id)
    }
}

/// A session authenticated against `fake`, which keeps recording calls.
pub async fn session(fake: &Arc<FakeApi>) -> Session {
    let api = fake.clone();
    let credentials = Credentials::new("ck", "cs", "at", "ats");
    let connect = move |_: &Credentials| -> Arc<dyn TwitterApi> { api };
    Session::authenticate(&credentials, &RetryPolicy::default(), connect)
        .await
        .unwrap()
}

fn paginate(pages: Vec<Vec<Tweet>>) -> Vec<Page> {
    let n = pages.len();
    pages
        .into_iter()
        .enumerate()
        .map(|(i, tweets)| Page {
            tweets,
            next_token: (i + 1 < n).then(|| format!("page-{}", i + 1)),
            problems: Vec::new(),
        })
        .collect()
}

fn page_at(pages: &[Page], pagination_token: Option<&str>) -> Page {
    let index = pagination_token
        .and_then(|token| token.strip_prefix("page-"))
        .and_then(|i| i.parse::<usize>().ok())
        .unwrap_or(0);
    pages.get(index).cloned().unwrap_or_default()
}

pub fn status_error(status: u16) -> ApiError {
    let reason = match status {
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        _ => "Error",
    };
    ApiError::Status {
        status,
        reason: reason.to_string(),
        detail: String::from("fake failure"),
        retry_after: None,
    }
}

pub fn at(timestamp: &str) -> DateTime<Utc> {
    timestamp.parse().unwrap()
}

pub fn post(id: &str, created_at: &str) -> Tweet {
    Tweet {
        id: id.to_string(),
        text: String::new(),
        created_at: Some(at(created_at)),
        in_reply_to_user_id: None,
        referenced_tweets: None,
    }
}

pub fn reply(id: &str, created_at: &str) -> Tweet {
    Tweet {
        in_reply_to_user_id: Some(String::from("42")),
        ..referencing(id, created_at, "replied_to")
    }
}

pub fn quote(id: &str, created_at: &str) -> Tweet {
    referencing(id, created_at, "quoted")
}

pub fn retweet(id: &str, created_at: &str) -> Tweet {
    referencing(id, created_at, "retweeted")
}

pub fn referencing(id: &str, created_at: &str, kind: &str) -> Tweet {
    Tweet {
        referenced_tweets: Some(vec![TweetReference {
            r#type: kind.to_string(),
            id: format!("ref-{id}"),
        }]),
        ..post(id, created_at)
    }
}
