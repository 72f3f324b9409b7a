use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("api error: {error} ({description})")]
    Api { error: String, description: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("session is not authorized")]
    Unauthorized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PeerKind {
    User,
    Group,
    Channel,
}

/// Handle the messaging service uses to address a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRef {
    pub kind: PeerKind,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_hash: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub access_hash: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: i64,
    #[serde(default)]
    pub access_hash: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Entity {
    User(User),
    Group(Group),
    Channel(Channel),
}

impl Entity {
    pub fn peer(&self) -> PeerRef {
        match self {
            Entity::User(user) => PeerRef {
                kind: PeerKind::User,
                id: user.id,
                access_hash: user.access_hash,
            },
            Entity::Group(group) => PeerRef {
                kind: PeerKind::Group,
                id: group.id,
                access_hash: None,
            },
            Entity::Channel(channel) => PeerRef {
                kind: PeerKind::Channel,
                id: channel.id,
                access_hash: channel.access_hash,
            },
        }
    }

    pub fn username(&self) -> Option<&str> {
        let username = match self {
            Entity::User(user) => user.username.as_deref(),
            Entity::Channel(channel) => channel.username.as_deref(),
            Entity::Group(_) => None,
        };
        non_empty(username)
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            Entity::User(user) => non_empty(user.phone.as_deref()),
            Entity::Group(_) | Entity::Channel(_) => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Entity::Group(group) => non_empty(group.title.as_deref()),
            Entity::Channel(channel) => non_empty(channel.title.as_deref()),
            Entity::User(_) => None,
        }
    }

    pub fn full_name(&self) -> Option<String> {
        let Entity::User(user) = self else {
            return None;
        };
        let first = non_empty(user.first_name.as_deref());
        let last = non_empty(user.last_name.as_deref());
        if first.is_none() && last.is_none() {
            return None;
        }
        let joined = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""));
        Some(joined.trim().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialog {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub entity: Entity,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub unread_mentions_count: u32,
}

impl Dialog {
    /// Dialog name, dialog title, full name, `@username`, then "Unknown".
    pub fn display_name(&self) -> String {
        let name = non_empty(self.name.as_deref())
            .or_else(|| non_empty(self.title.as_deref()))
            .map(str::to_string)
            .or_else(|| self.entity.full_name())
            .or_else(|| self.entity.username().map(|username| format!("@{username}")))
            .unwrap_or_else(|| "Unknown".to_string());
        layout::sanitize_line(&name)
    }

    pub fn peer(&self) -> PeerRef {
        self.entity.peer()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    #[serde(default)]
    pub text: String,
    /// Media class name when the message carries an attachment.
    #[serde(default)]
    pub media: Option<String>,
    #[serde(default)]
    pub date: i64,
    #[serde(default, alias = "out")]
    pub outgoing: bool,
}

impl Message {
    /// `None` for messages with neither text nor media.
    pub fn display_text(&self) -> Option<String> {
        if !self.text.is_empty() {
            return Some(layout::sanitize(&self.text));
        }
        self.media
            .as_ref()
            .map(|kind| format!("[Media: {}]", layout::sanitize_line(kind)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: i64,
}

/// Operations the commands need from the messaging service.
pub trait MessagingClient {
    async fn list_dialogs(&self, limit: usize) -> Result<Vec<Dialog>, ClientError>;

    async fn lookup_entity(&self, identifier: &str) -> Result<Entity, ClientError>;

    /// Newest first.
    async fn get_messages(&self, peer: &PeerRef, limit: usize) -> Result<Vec<Message>, ClientError>;

    async fn send_message(&self, peer: &PeerRef, text: &str) -> Result<SentMessage, ClientError>;
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(first: Option<&str>, last: Option<&str>, username: Option<&str>) -> Entity {
        Entity::User(User {
            id: 7,
            access_hash: Some(99),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            username: username.map(str::to_string),
            phone: None,
        })
    }

    fn dialog(name: Option<&str>, title: Option<&str>, entity: Entity) -> Dialog {
        Dialog {
            name: name.map(str::to_string),
            title: title.map(str::to_string),
            entity,
            unread_count: 0,
            unread_mentions_count: 0,
        }
    }

    #[test]
    fn display_name_precedence() {
        let entity = user(Some("Ada"), Some("Lovelace"), Some("ada"));
        assert_eq!(dialog(Some("Name"), Some("Title"), entity.clone()).display_name(), "Name");
        assert_eq!(dialog(Some(""), Some("Title"), entity.clone()).display_name(), "Title");
        assert_eq!(dialog(None, None, entity).display_name(), "Ada Lovelace");
        assert_eq!(dialog(None, None, user(None, Some("Byron"), None)).display_name(), "Byron");
        assert_eq!(dialog(None, None, user(None, None, Some("ada"))).display_name(), "@ada");
        assert_eq!(dialog(None, None, user(None, None, None)).display_name(), "Unknown");
        let group = Entity::Group(Group { id: 1, title: None });
        assert_eq!(dialog(None, None, group).display_name(), "Unknown");
    }

    #[test]
    fn entity_accessors_follow_kind() {
        let channel = Entity::Channel(Channel {
            id: -100123,
            access_hash: Some(5),
            title: Some("News".to_string()),
            username: Some("news".to_string()),
        });
        assert_eq!(channel.username(), Some("news"));
        assert_eq!(channel.phone(), None);
        assert_eq!(channel.title(), Some("News"));
        assert_eq!(channel.full_name(), None);
        assert_eq!(
            channel.peer(),
            PeerRef {
                kind: PeerKind::Channel,
                id: -100123,
                access_hash: Some(5),
            }
        );
    }

    #[test]
    fn message_display_text_falls_back_to_media() {
        let mut message = Message {
            id: 1,
            text: String::new(),
            media: Some("MessageMediaPhoto".to_string()),
            date: 0,
            outgoing: false,
        };
        assert_eq!(message.display_text().as_deref(), Some("[Media: MessageMediaPhoto]"));
        message.media = None;
        assert_eq!(message.display_text(), None);
        message.text = "hi".to_string();
        assert_eq!(message.display_text().as_deref(), Some("hi"));
    }

    #[test]
    fn remote_text_loses_terminal_control_sequences() {
        let message = Message {
            id: 1,
            text: "hi\x1b[0m there \x1b]0;pwned\x07 \x1b[2J".to_string(),
            media: None,
            date: 0,
            outgoing: false,
        };
        assert_eq!(message.display_text().as_deref(), Some("hi there  "));

        let spoofed = dialog(Some("Bank\x1b[2J\nSupport"), None, user(None, None, None));
        assert_eq!(spoofed.display_name(), "Bank Support");
    }

    #[test]
    fn dialog_deserializes_tagged_entity() {
        let value = json!({
            "name": "Bob Lee",
            "entity": {
                "type": "user",
                "id": 42,
                "username": "boblee",
                "phone": "15551230000"
            },
            "unreadCount": 3
        });
        let dialog: Dialog = serde_json::from_value(value).expect("dialog");
        assert_eq!(dialog.unread_count, 3);
        assert_eq!(dialog.unread_mentions_count, 0);
        assert_eq!(dialog.entity.phone(), Some("15551230000"));
        assert_eq!(dialog.peer().kind, PeerKind::User);

        let message: Message =
            serde_json::from_value(json!({ "id": 1, "date": 10, "out": true })).expect("message");
        assert!(message.outgoing);
        assert!(message.text.is_empty());
    }
}
