use serde::Serialize;
use thiserror::Error;

use crate::client::{Dialog, Message, PeerRef};
use crate::dates;
use crate::layout::{pad_right, sanitize_line, visible_length};
use crate::resolver::Resolution;
use crate::style::{Painter, Style};

const COLUMN_GAP: &str = "  ";

const HEADER: Style = Style::new().bold().fg(140, 190, 255);
const NAME: Style = Style::new().fg(240, 240, 240);
const PHONE: Style = Style::new().fg(170, 220, 255);
const USERNAME: Style = Style::new().fg(175, 240, 175);
const UNREAD: Style = Style::new().fg(255, 200, 120);
const MENTIONS: Style = Style::new().fg(255, 150, 200);

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRow {
    pub name: String,
    pub phone: String,
    pub username: String,
    pub unread: String,
    pub mentions: String,
}

impl ChatRow {
    pub fn from_dialog(dialog: &Dialog) -> Self {
        Self {
            name: dialog.display_name(),
            phone: dialog
                .entity
                .phone()
                .map(|phone| format!("+{}", sanitize_line(phone)))
                .unwrap_or_else(|| "-".to_string()),
            username: dialog
                .entity
                .username()
                .map(|username| format!("@{}", sanitize_line(username)))
                .unwrap_or_else(|| "-".to_string()),
            unread: dialog.unread_count.to_string(),
            mentions: dialog.unread_mentions_count.to_string(),
        }
    }

    fn header() -> Self {
        Self {
            name: "Name".to_string(),
            phone: "Phone".to_string(),
            username: "Username".to_string(),
            unread: "Unread".to_string(),
            mentions: "Mentions".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnWidths {
    pub name: usize,
    pub phone: usize,
    pub username: usize,
    pub unread: usize,
    pub mentions: usize,
}

impl ColumnWidths {
    fn fit(&mut self, row: &ChatRow) {
        self.name = self.name.max(visible_length(&row.name));
        self.phone = self.phone.max(visible_length(&row.phone));
        self.username = self.username.max(visible_length(&row.username));
        self.unread = self.unread.max(visible_length(&row.unread));
        self.mentions = self.mentions.max(visible_length(&row.mentions));
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTable {
    pub rows: Vec<ChatRow>,
    pub widths: ColumnWidths,
}

impl ChatTable {
    pub fn from_dialogs(dialogs: &[Dialog]) -> Self {
        let rows: Vec<ChatRow> = dialogs.iter().map(ChatRow::from_dialog).collect();
        let mut widths = ColumnWidths::default();
        widths.fit(&ChatRow::header());
        for row in &rows {
            widths.fit(row);
        }
        Self { rows, widths }
    }

    pub fn lines(&self, painter: Painter) -> Vec<String> {
        let widths = &self.widths;
        let header = ChatRow::header();
        let header_line = [
            pad_right(&header.name, widths.name),
            pad_right(&header.phone, widths.phone),
            pad_right(&header.username, widths.username),
            pad_right(&header.unread, widths.unread),
            pad_right(&header.mentions, widths.mentions),
        ]
        .join(COLUMN_GAP);

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(painter.paint(&header_line, HEADER));
        for row in &self.rows {
            // Cells are colored first; padding skips the escapes.
            let line = [
                pad_right(&painter.paint(&row.name, NAME), widths.name),
                pad_right(&painter.paint(&row.phone, PHONE), widths.phone),
                pad_right(&painter.paint(&row.username, USERNAME), widths.username),
                pad_right(&painter.paint(&row.unread, UNREAD), widths.unread),
                pad_right(&painter.paint(&row.mentions, MENTIONS), widths.mentions),
            ]
            .join(COLUMN_GAP);
            lines.push(line);
        }
        lines
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageItem {
    pub id: i64,
    pub text: Option<String>,
    pub date: i64,
    pub clock: String,
    pub outgoing: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListOutput {
    pub recipient: String,
    pub conversation: String,
    pub peer: PeerRef,
    pub unread: Option<u32>,
    /// Oldest first.
    pub items: Vec<MessageItem>,
}

impl MessageListOutput {
    pub fn new(resolution: &Resolution, messages: &[Message]) -> Self {
        let items = messages
            .iter()
            .rev()
            .map(|message| MessageItem {
                id: message.id,
                text: message.display_text(),
                date: message.date,
                clock: dates::format_clock(message.date),
                outgoing: message.outgoing,
            })
            .collect();
        Self {
            recipient: resolution.label.clone(),
            conversation: resolution.conversation_name(),
            peer: resolution.peer.clone(),
            unread: resolution.dialog.as_ref().map(|dialog| dialog.unread_count),
            items,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutput {
    pub id: i64,
    pub recipient: String,
    pub peer: PeerRef,
}

pub fn json_string<T: Serialize + ?Sized>(value: &T) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(value)?)
}
