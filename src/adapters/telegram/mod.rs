//! Telegram Signal Source
//!
//! Long-polls the Bot API for channel posts and hands them to the listener
//! as plain `ChannelMessage`s. The Bot API only delivers posts from chats
//! the bot has joined, so the bot must be added to every signal channel;
//! channels that cannot add bots are out of reach of this source.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, MessageEntityKind, UpdateKind};
use teloxide::{ApiError, RequestError};

use crate::ports::source::{ChannelMessage, SignalSource, SignalSourceError};

pub struct TelegramSource {
    bot: Bot,
    /// Next update id to request
    offset: i32,
    poll_timeout_secs: u32,
}

/// Slack on top of the long-poll timeout before the HTTP request gives up
const HTTP_TIMEOUT_MARGIN_SECS: u64 = 10;

impl TelegramSource {
    pub fn new(bot_token: impl Into<String>, poll_timeout_secs: u32) -> Result<Self, SignalSourceError> {
        // the default client times out before a long poll returns
        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(poll_timeout_secs as u64 + HTTP_TIMEOUT_MARGIN_SECS))
            .build()
            .map_err(|e| SignalSourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            bot: Bot::with_client(bot_token, client),
            offset: 0,
            poll_timeout_secs,
        })
    }
}

#[async_trait]
impl SignalSource for TelegramSource {
    async fn next_batch(&mut self) -> Result<Vec<ChannelMessage>, SignalSourceError> {
        let mut request = self
            .bot
            .get_updates()
            .timeout(self.poll_timeout_secs)
            .allowed_updates(vec![AllowedUpdate::ChannelPost, AllowedUpdate::Message]);
        if self.offset > 0 {
            request = request.offset(self.offset);
        }

        let updates = request.await.map_err(map_request_error)?;

        let mut batch = Vec::with_capacity(updates.len());
        for update in updates {
            // acknowledge every update, including the ones we skip
            self.offset = self.offset.max(update.id.0 as i32 + 1);

            if let Some(message) = channel_message(&update.kind) {
                batch.push(message);
            }
        }

        tracing::trace!(count = batch.len(), offset = self.offset, "Telegram poll");
        Ok(batch)
    }
}

fn map_request_error(err: RequestError) -> SignalSourceError {
    match err {
        RequestError::Api(ApiError::InvalidToken) => SignalSourceError::Auth(err.to_string()),
        RequestError::Network(_) | RequestError::Io(_) => SignalSourceError::Network(err.to_string()),
        other => SignalSourceError::Api(other.to_string()),
    }
}

/// Text and link of a channel post or group message, if it has any text
fn channel_message(kind: &UpdateKind) -> Option<ChannelMessage> {
    let message = match kind {
        UpdateKind::ChannelPost(message) | UpdateKind::Message(message) => message,
        _ => return None,
    };

    let text = message.text().or_else(|| message.caption())?;
    let entities = message.entities().or_else(|| message.caption_entities());

    // preview URL first, then hidden links, then URLs typed into the body
    let link = message
        .link_preview_options()
        .and_then(|preview| preview.url.clone())
        .or_else(|| {
            entities
                .into_iter()
                .flatten()
                .find_map(|entity| match &entity.kind {
                    MessageEntityKind::TextLink { url } => Some(url.to_string()),
                    _ => None,
                })
        })
        .or_else(|| first_url(text).map(str::to_string));

    let mut channel_message = ChannelMessage::new(message.chat.id.0, text);
    channel_message.link = link;
    Some(channel_message)
}

fn first_url(text: &str) -> Option<&str> {
    text.split_whitespace()
        .find(|word| word.starts_with("https://") || word.starts_with("http://"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::Update;

    fn update(json: serde_json::Value) -> Update {
        // teloxide's Update deserializer only handles self-describing input read from text
        serde_json::from_str(&json.to_string()).unwrap()
    }

    #[test]
    fn test_channel_post_with_text_link() {
        let update = update(serde_json::json!({
            "update_id": 10,
            "channel_post": {
                "message_id": 77,
                "sender_chat": { "id": -1001234567890i64, "title": "Calls", "type": "channel" },
                "chat": { "id": -1001234567890i64, "title": "Calls", "type": "channel" },
                "date": 1717000000,
                "text": "🔥🔥🔥 POPCAT | $0.004 chart",
                "entities": [
                    { "type": "text_link", "offset": 23, "length": 5, "url": "https://t.me/bot?start=token_MintB" }
                ]
            }
        }));

        let message = channel_message(&update.kind).unwrap();
        assert_eq!(message.channel_id, -1001234567890);
        assert!(message.text.starts_with("🔥🔥🔥"));
        assert_eq!(message.link.as_deref(), Some("https://t.me/bot?start=token_MintB"));
    }

    #[test]
    fn test_link_preview_url_wins() {
        let update = update(serde_json::json!({
            "update_id": 12,
            "channel_post": {
                "message_id": 79,
                "chat": { "id": -1001234567890i64, "title": "Calls", "type": "channel" },
                "date": 1717000002,
                "text": "🔥🔥🔥 WIF | $2.1 https://dex.example/other_MintX",
                "entities": [
                    { "type": "text_link", "offset": 0, "length": 3, "url": "https://t.me/bot?start=token_MintY" }
                ],
                "link_preview_options": { "url": "https://t.me/bot?start=token_MintD" }
            }
        }));

        let message = channel_message(&update.kind).unwrap();
        assert_eq!(message.link.as_deref(), Some("https://t.me/bot?start=token_MintD"));
    }

    #[test]
    fn test_caption_and_plain_url() {
        let update = update(serde_json::json!({
            "update_id": 11,
            "channel_post": {
                "message_id": 78,
                "chat": { "id": -1001234567890i64, "title": "Calls", "type": "channel" },
                "date": 1717000001,
                "photo": [
                    { "file_id": "f", "file_unique_id": "u", "width": 90, "height": 90 }
                ],
                "caption": "see https://dex.example/x_MintC now"
            }
        }));

        let message = channel_message(&update.kind).unwrap();
        assert_eq!(message.link.as_deref(), Some("https://dex.example/x_MintC"));
    }

    #[test]
    fn test_first_url() {
        assert_eq!(first_url("a http://x.example/b c"), Some("http://x.example/b"));
        assert_eq!(first_url("no links here"), None);
    }
}
