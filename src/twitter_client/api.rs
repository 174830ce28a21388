use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Response<Data> {
    pub data: Option<Data>,
    pub meta: Option<Meta>,
    pub errors: Option<Vec<Problem>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Meta {
    pub next_token: Option<String>,
    #[serde(default)]
    pub result_count: i64,
    pub newest_id: Option<String>,
    pub oldest_id: Option<String>,
}

/// Partial error reported alongside (or instead of) `data`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Problem {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub message: Option<String>,
    pub r#type: Option<String>,
    pub resource_id: Option<String>,
}

impl Problem {
    pub fn describe(&self) -> String {
        let text = self
            .detail
            .as_deref()
            .or(self.message.as_deref())
            .or(self.title.as_deref())
            .unwrap_or("unknown error");
        match &self.resource_id {
            Some(id) => format!("{text} (resource {id})"),
            None => text.to_string(),
        }
    }
}

/// Body of a non-2xx response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub errors: Option<Vec<Problem>>,
}

impl ErrorBody {
    pub fn describe(&self) -> Option<String> {
        self.detail
            .clone()
            .or_else(|| {
                self.errors
                    .as_ref()
                    .and_then(|errors| errors.first())
                    .map(Problem::describe)
            })
            .or_else(|| self.title.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub in_reply_to_user_id: Option<String>,
    pub referenced_tweets: Option<Vec<TweetReference>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TweetReference {
    pub r#type: String,
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Liked {
    pub liked: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}

/// One page of a timeline walk.
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub tweets: Vec<Tweet>,
    pub next_token: Option<String>,
    pub problems: Vec<Problem>,
}

impl From<Response<Vec<Tweet>>> for Page {
    fn from(resp: Response<Vec<Tweet>>) -> Self {
        Self {
            tweets: resp.data.unwrap_or_default(),
            next_token: resp.meta.and_then(|meta| meta.next_token),
            problems: resp.errors.unwrap_or_default(),
        }
    }
}
