//! Inbound webhook event model.
//!
//! A delivery batch is `{"events": [...]}` where each element is tagged by
//! `type`. Kinds this bot does not handle decode as [`Event::Unknown`] so a
//! batch never fails on an unfamiliar event.

use serde::Deserialize;

/// Where an event came from. Group and room sources carry no `userId`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    pub user_id: Option<String>,
}

/// One unit of a webhook delivery batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    Message {
        reply_token: Option<String>,
        #[serde(default)]
        source: EventSource,
        message: MessageContent,
    },
    #[serde(rename_all = "camelCase")]
    Postback {
        reply_token: Option<String>,
        #[serde(default)]
        source: EventSource,
        postback: Postback,
    },
    #[serde(rename_all = "camelCase")]
    Follow {
        reply_token: Option<String>,
        #[serde(default)]
        source: EventSource,
    },
    Unfollow {
        #[serde(default)]
        source: EventSource,
    },
    #[serde(other)]
    Unknown,
}

/// Message payload, tagged by subtype. Subtypes without a handler (stickers,
/// locations, ...) decode as [`MessageContent::Unknown`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Image {
        id: String,
    },
    Video {
        id: String,
    },
    Audio {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    File {
        id: String,
        file_name: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl MessageContent {
    /// Content id and media kind for downloadable subtypes.
    pub fn media(&self) -> Option<(&str, MediaKind)> {
        match self {
            Self::Image { id } => Some((id, MediaKind::Image)),
            Self::Video { id } => Some((id, MediaKind::Video)),
            Self::Audio { id } => Some((id, MediaKind::Audio)),
            Self::File { id, .. } => Some((id, MediaKind::File)),
            Self::Text { .. } | Self::Unknown => None,
        }
    }
}

/// Kind of downloadable media attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    File,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::File => "file",
        };
        f.write_str(kind)
    }
}

/// Raw postback payload attached to a rich-card control.
#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    pub data: String,
}

/// Parsed postback action. The payload is a flat `key=value&key=value`
/// query string with an `action` discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostbackAction {
    Config { option: ConfigOption, value: String },
    CancelResearch,
}

/// Config fields a postback control may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOption {
    WebSearch,
    MaxQueries,
    ReportFormat,
}

impl ConfigOption {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "web_search" => Some(Self::WebSearch),
            "max_queries" => Some(Self::MaxQueries),
            "report_format" => Some(Self::ReportFormat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebSearch => "web_search",
            Self::MaxQueries => "max_queries",
            Self::ReportFormat => "report_format",
        }
    }
}

/// Why a postback payload could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostbackError {
    #[error("malformed postback pair: {0}")]
    MalformedPair(String),
    #[error("postback payload has no `action` field")]
    MissingAction,
    #[error("unknown postback action: {0}")]
    UnknownAction(String),
    #[error("config postback is missing `option` or `value`")]
    MissingConfigField,
    #[error("unknown config option: {0}")]
    UnknownOption(String),
}

impl PostbackAction {
    pub fn parse(data: &str) -> Result<Self, PostbackError> {
        let mut action = None;
        let mut option = None;
        let mut value = None;

        for pair in data.split('&').filter(|p| !p.is_empty()) {
            let (key, val) = pair
                .split_once('=')
                .ok_or_else(|| PostbackError::MalformedPair(pair.to_string()))?;
            match key {
                "action" => action = Some(val),
                "option" => option = Some(val),
                "value" => value = Some(val),
                // Unknown keys are carried by some rich-card templates; ignore.
                _ => {},
            }
        }

        match action.ok_or(PostbackError::MissingAction)? {
            "config" => {
                let option = option.ok_or(PostbackError::MissingConfigField)?;
                let value = value.ok_or(PostbackError::MissingConfigField)?;
                let option = ConfigOption::parse(option)
                    .ok_or_else(|| PostbackError::UnknownOption(option.to_string()))?;
                Ok(Self::Config {
                    option,
                    value: value.to_string(),
                })
            },
            "cancel_research" => Ok(Self::CancelResearch),
            other => Err(PostbackError::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn decode_text_message_event() {
        let event: Event = serde_json::from_value(json!({
            "type": "message",
            "replyToken": "R1",
            "source": {"type": "user", "userId": "U1"},
            "message": {"type": "text", "id": "1234", "text": "hello"}
        }))
        .unwrap();

        match event {
            Event::Message {
                reply_token,
                source,
                message: MessageContent::Text { text },
            } => {
                assert_eq!(reply_token.as_deref(), Some("R1"));
                assert_eq!(source.user_id.as_deref(), Some("U1"));
                assert_eq!(text, "hello");
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decode_file_message_event() {
        let event: Event = serde_json::from_value(json!({
            "type": "message",
            "replyToken": "R1",
            "source": {"userId": "U1"},
            "message": {"type": "file", "id": "5678", "fileName": "report.pdf"}
        }))
        .unwrap();

        let Event::Message { message, .. } = event else {
            panic!("expected message event");
        };
        assert_eq!(
            message.media().map(|(id, kind)| (id.to_string(), kind)),
            Some(("5678".to_string(), MediaKind::File))
        );
    }

    #[test]
    fn unhandled_event_kind_decodes_as_unknown() {
        let event: Event = serde_json::from_value(json!({
            "type": "memberJoined",
            "joined": {"members": []}
        }))
        .unwrap();
        assert!(matches!(event, Event::Unknown));
    }

    #[test]
    fn unhandled_message_subtype_decodes_as_unknown() {
        let event: Event = serde_json::from_value(json!({
            "type": "message",
            "replyToken": "R1",
            "source": {"userId": "U1"},
            "message": {"type": "sticker", "packageId": "1", "stickerId": "2"}
        }))
        .unwrap();

        let Event::Message { message, .. } = event else {
            panic!("expected message event");
        };
        assert!(matches!(message, MessageContent::Unknown));
        assert!(message.media().is_none());
    }

    #[test]
    fn missing_source_defaults_to_empty() {
        let event: Event = serde_json::from_value(json!({
            "type": "follow",
            "replyToken": "R1"
        }))
        .unwrap();

        let Event::Follow { source, .. } = event else {
            panic!("expected follow event");
        };
        assert!(source.user_id.is_none());
    }

    #[test]
    fn parse_config_postback() {
        let action = PostbackAction::parse("action=config&option=max_queries&value=5").unwrap();
        assert_eq!(
            action,
            PostbackAction::Config {
                option: ConfigOption::MaxQueries,
                value: "5".into()
            }
        );
    }

    #[test]
    fn parse_cancel_postback() {
        let action = PostbackAction::parse("action=cancel_research").unwrap();
        assert_eq!(action, PostbackAction::CancelResearch);
    }

    #[test]
    fn parse_postback_without_action() {
        assert_eq!(
            PostbackAction::parse("option=web_search&value=true"),
            Err(PostbackError::MissingAction)
        );
    }

    #[test]
    fn parse_postback_unknown_action() {
        assert_eq!(
            PostbackAction::parse("action=subscribe"),
            Err(PostbackError::UnknownAction("subscribe".into()))
        );
    }

    #[test]
    fn parse_postback_malformed_pair() {
        assert_eq!(
            PostbackAction::parse("action=config&garbage"),
            Err(PostbackError::MalformedPair("garbage".into()))
        );
    }

    #[test]
    fn parse_config_postback_missing_value() {
        assert_eq!(
            PostbackAction::parse("action=config&option=web_search"),
            Err(PostbackError::MissingConfigField)
        );
    }

    #[test]
    fn parse_config_postback_unknown_option() {
        assert_eq!(
            PostbackAction::parse("action=config&option=theme&value=dark"),
            Err(PostbackError::UnknownOption("theme".into()))
        );
    }
}
