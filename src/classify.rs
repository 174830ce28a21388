use crate::content::{ContentItem, ReferenceKind};
use crate::selection::Selection;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Reply,
    Quote,
    Retweet,
    Original,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reply => "reply",
            Self::Quote => "quote tweet",
            Self::Retweet => "retweet",
            Self::Original => "own post",
        };
        f.write_str(name)
    }
}

/// Retweets win over everything else; then reply, then quote. Anything left is an original
/// post, including items that only carry reference kinds we don't know about.
pub fn classify(item: &ContentItem) -> Category {
    if item.has_reference(&ReferenceKind::Retweeted) {
        Category::Retweet
    } else if item.is_reply() {
        Category::Reply
    } else if item.has_reference(&ReferenceKind::Quoted) {
        Category::Quote
    } else {
        Category::Original
    }
}

/// Which deletion path, if any, fires for an authored item. First match wins: a reply
/// (when replies are selected), else a quote (when quotes are selected), else a plain post
/// (when posts are selected). Retweets never match.
pub fn deletion_target(item: &ContentItem, selection: Selection) -> Option<Category> {
    if classify(item) == Category::Retweet {
        return None;
    }
    let is_reply = item.is_reply();
    let is_quote = item.has_reference(&ReferenceKind::Quoted);

    if selection.contains(Selection::REPLIES) && is_reply {
        Some(Category::Reply)
    } else if selection.contains(Selection::QUOTES) && is_quote {
        Some(Category::Quote)
    } else if selection.contains(Selection::POSTS) && !is_reply && !is_quote {
        Some(Category::Original)
    } else {
        None
    }
}
