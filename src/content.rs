use crate::twitter_client::api;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReferenceKind {
    RepliedTo,
    Quoted,
    Retweeted,
    Other(String),
}

impl From<&str> for ReferenceKind {
    fn from(kind: &str) -> Self {
        match kind {
            "replied_to" => Self::RepliedTo,
            "quoted" => Self::Quoted,
            "retweeted" => Self::Retweeted,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub id: String,
}

/// A liked or authored tweet as the deletion engine sees it. Ids are opaque tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentItem {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub in_reply_to_user_id: Option<String>,
    pub references: Vec<Reference>,
}

impl ContentItem {
    pub fn has_reference(&self, kind: &ReferenceKind) -> bool {
        self.references.iter().any(|r| &r.kind == kind)
    }

    /// The reply-target indicator: an explicit reply target, or a `replied_to` reference
    /// when the API omitted `in_reply_to_user_id`.
    pub fn is_reply(&self) -> bool {
        self.in_reply_to_user_id.is_some() || self.has_reference(&ReferenceKind::RepliedTo)
    }
}

impl From<api::Tweet> for ContentItem {
    fn from(tweet: api::Tweet) -> Self {
        Self {
            id: tweet.id,
            created_at: tweet.created_at,
            in_reply_to_user_id: tweet.in_reply_to_user_id,
            references: tweet
                .referenced_tweets
                .unwrap_or_default()
                .into_iter()
                .map(|r| Reference {
                    kind: ReferenceKind::from(r.r#type.as_str()),
                    id: r.id,
                })
                .collect(),
        }
    }
}
