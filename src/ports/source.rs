use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalSourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Unauthorized: {0}")]
    Auth(String),
}

/// One post delivered by the message feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub channel_id: i64,
    pub text: String,
    /// Link attached to the post (web preview or first URL), if any
    pub link: Option<String>,
}

impl ChannelMessage {
    pub fn new(channel_id: i64, text: impl Into<String>) -> Self {
        Self {
            channel_id,
            text: text.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// A feed of channel posts.
///
/// `next_batch` blocks until at least one post is available or the
/// underlying poll times out, in which case it returns an empty batch.
#[async_trait]
pub trait SignalSource: Send {
    async fn next_batch(&mut self) -> Result<Vec<ChannelMessage>, SignalSourceError>;
}

/// Set of channels whose posts are acted on.
///
/// Ids are compared in their short form: a Bot API channel id such as
/// `-1001234567890` matches a configured `1234567890` and vice versa.
#[derive(Debug, Clone, Default)]
pub struct ChannelAllowList {
    ids: HashSet<i64>,
}

impl ChannelAllowList {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().map(normalize_channel_id).collect(),
        }
    }

    pub fn contains(&self, channel_id: i64) -> bool {
        self.ids.contains(&normalize_channel_id(channel_id))
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

const BOT_API_CHANNEL_OFFSET: i64 = 1_000_000_000_000;

fn normalize_channel_id(id: i64) -> i64 {
    if id <= -BOT_API_CHANNEL_OFFSET {
        -id - BOT_API_CHANNEL_OFFSET
    } else {
        id.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_matches_both_id_forms() {
        let list = ChannelAllowList::new([1234567890, -1009876543210]);

        assert!(list.contains(1234567890));
        assert!(list.contains(-1001234567890));
        assert!(list.contains(9876543210));
        assert!(list.contains(-1009876543210));
        assert!(!list.contains(42));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_empty_allow_list_matches_nothing() {
        let list = ChannelAllowList::default();
        assert!(list.is_empty());
        assert!(!list.contains(1234567890));
    }

    #[test]
    fn test_channel_message_builder() {
        let msg = ChannelMessage::new(7, "hello").with_link("https://x.example/a_b");
        assert_eq!(msg.channel_id, 7);
        assert_eq!(msg.link.as_deref(), Some("https://x.example/a_b"));
    }
}
