use crate::error::ValidationError;
use bitflags::bitflags;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use std::fmt;

bitflags! {
    /// Which kinds of content a run removes.
    pub struct Selection: u8 {
        const LIKES = 0b0001;
        const REPLIES = 0b0010;
        const POSTS = 0b0100;
        const QUOTES = 0b1000;
        const TWEETS = Self::REPLIES.bits | Self::POSTS.bits | Self::QUOTES.bits;
    }
}

impl Selection {
    pub fn from_flags(likes: bool, replies: bool, posts: bool, quotes: bool) -> Self {
        let mut selection = Self::empty();
        selection.set(Self::LIKES, likes);
        selection.set(Self::REPLIES, replies);
        selection.set(Self::POSTS, posts);
        selection.set(Self::QUOTES, quotes);
        selection
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Err(ValidationError::NothingSelected)
        } else {
            Ok(())
        }
    }

    pub fn wants_tweets(&self) -> bool {
        self.intersects(Self::TWEETS)
    }
}

/// Inclusive `[start, end]` in UTC, covering whole calendar days.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// `start` at 00:00:00.000000Z through `end` at 23:59:59.999999Z.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedRange { start, end });
        }
        let first = NaiveTime::from_hms_opt(0, 0, 0);
        let last = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999);
        match (first, last) {
            (Some(first), Some(last)) => Ok(Self {
                start: Utc.from_utc_datetime(&start.and_time(first)),
                end: Utc.from_utc_datetime(&end.and_time(last)),
            }),
            _ => Err(ValidationError::BadDate(format!("{start}..{end}"))),
        }
    }

    /// Parses two `YYYY-MM-DD` dates.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::from_dates(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn is_before_start(&self, t: DateTime<Utc>) -> bool {
        t < self.start
    }

    pub fn is_after_end(&self, t: DateTime<Utc>) -> bool {
        t > self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::BadDate(s.to_string()))
}
