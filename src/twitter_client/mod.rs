pub mod api;
#[cfg(test)]
pub mod fake;
pub mod oauth;
pub mod retry;

use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::ApiError;
use async_trait::async_trait;
use chrono::Utc;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use hyper::client::HttpConnector;
use hyper::header::AUTHORIZATION;
use hyper::{Body, Client, Method, Request};
use hyper_tls::HttpsConnector;
use nonzero_ext::nonzero;
use oauth::OAuthSigner;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;
use url::Url;

type DefaultDirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const LIKED_TWEET_FIELDS: &str = "created_at";
const USER_TWEET_FIELDS: &str = "created_at,in_reply_to_user_id,referenced_tweets";

/// The slice of Twitter API v2 this tool talks to.
#[async_trait]
pub trait TwitterApi: Send + Sync {
    async fn me(&self) -> Result<api::Response<api::User>, ApiError>;

    async fn liked_tweets(
        &self,
        user_id: &str,
        max_results: u32,
        pagination_token: Option<&str>,
    ) -> Result<api::Page, ApiError>;

    async fn users_tweets(
        &self,
        user_id: &str,
        max_results: u32,
        pagination_token: Option<&str>,
    ) -> Result<api::Page, ApiError>;

    /// `user_id` is the liking (authenticated) user, as the endpoint requires.
    async fn unlike(&self, user_id: &str, tweet_id: &str) -> Result<(), ApiError>;

    async fn delete_tweet(&self, tweet_id: &str) -> Result<(), ApiError>;
}

pub struct TwitterClient {
    https_client: Client<HttpsConnector<HttpConnector>>,
    base_url: String,
    signer: OAuthSigner,
    mutation_limiter: Option<DefaultDirectRateLimiter>,
}

impl TwitterClient {
    pub fn new(credentials: &Credentials, config: &Config) -> Self {
        let https = HttpsConnector::new();
        let https_client = Client::builder().build::<_, hyper::Body>(https);
        let mutation_limiter = NonZeroU32::new(config.mutations_per_minute)
            .map(|n| RateLimiter::direct(Quota::per_minute(n).allow_burst(nonzero!(1u32))));

        Self {
            https_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            signer: OAuthSigner::new(credentials),
            mutation_limiter,
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let authorization = self.signer.sign(method.as_str(), &url, params)?;
        let uri = if params.is_empty() {
            url
        } else {
            Url::parse_with_params(&url, params)?.to_string()
        };
        debug!(%method, %uri, "request");

        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, authorization)
            .body(Body::empty())?;

        let resp = self.https_client.request(req).await?;
        let status = resp.status();
        let retry_after = resp
            .headers()
            .get("x-rate-limit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .map(|reset| {
                let secs = (reset - Utc::now().timestamp()).max(0) as u64;
                Duration::from_secs(secs + 1)
            });
        let bytes = hyper::body::to_bytes(resp.into_body()).await?;

        if !status.is_success() {
            let body: api::ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            let detail = body
                .describe()
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ApiError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                detail,
                retry_after,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn timeline(
        &self,
        path: &str,
        tweet_fields: &str,
        max_results: u32,
        pagination_token: Option<&str>,
    ) -> Result<api::Page, ApiError> {
        let mut params = vec![
            (String::from("max_results"), max_results.to_string()),
            (String::from("tweet.fields"), tweet_fields.to_string()),
        ];
        if let Some(pagination_token) = pagination_token {
            params.push((String::from("pagination_token"), pagination_token.to_string()));
        }
        let resp: api::Response<Vec<api::Tweet>> =
            self.request(Method::GET, path, &params).await?;
        Ok(resp.into())
    }

    async fn pace_mutation(&self) {
        if let Some(limiter) = &self.mutation_limiter {
            limiter.until_ready().await;
        }
    }
}

#[async_trait]
impl TwitterApi for TwitterClient {
    async fn me(&self) -> Result<api::Response<api::User>, ApiError> {
        self.request(Method::GET, "/2/users/me", &[]).await
    }

    async fn liked_tweets(
        &self,
        user_id: &str,
        max_results: u32,
        pagination_token: Option<&str>,
    ) -> Result<api::Page, ApiError> {
        let path = format!("/2/users/{user_id}/liked_tweets");
        self.timeline(&path, LIKED_TWEET_FIELDS, max_results, pagination_token)
            .await
    }

    async fn users_tweets(
        &self,
        user_id: &str,
        max_results: u32,
        pagination_token: Option<&str>,
    ) -> Result<api::Page, ApiError> {
        let path = format!("/2/users/{user_id}/tweets");
        self.timeline(&path, USER_TWEET_FIELDS, max_results, pagination_token)
            .await
    }

    async fn unlike(&self, user_id: &str, tweet_id: &str) -> Result<(), ApiError> {
        self.pace_mutation().await;
        let path = format!("/2/users/{user_id}/likes/{tweet_id}");
        let resp: api::Response<api::Liked> = self.request(Method::DELETE, &path, &[]).await?;
        match resp.data {
            Some(api::Liked { liked: false }) => Ok(()),
            _ => Err(ApiError::NoEffect(format!("tweet {tweet_id} is still liked"))),
        }
    }

    async fn delete_tweet(&self, tweet_id: &str) -> Result<(), ApiError> {
        self.pace_mutation().await;
        let path = format!("/2/tweets/{tweet_id}");
        let resp: api::Response<api::Deleted> = self.request(Method::DELETE, &path, &[]).await?;
        match resp.data {
            Some(api::Deleted { deleted: true }) => Ok(()),
            _ => Err(ApiError::NoEffect(format!("tweet {tweet_id} was not deleted"))),
        }
    }
}
