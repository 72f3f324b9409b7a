//! Chat-bubble rendering for `read`.

use chrono::TimeZone;

use crate::client::Message;
use crate::dates;
use crate::layout::{center, pad_left, pad_right, visible_length, wrap};
use crate::style::{Style, StyledLine};

pub const VIEW_WIDTH: usize = 80;
pub const BUBBLE_TEXT_WIDTH: usize = 54;

const OUTBOUND_TEXT: Style = Style::new().bg(95, 65, 160).fg(255, 255, 255);
const OUTBOUND_CLOCK: Style = Style::new().bg(95, 65, 160).fg(190, 190, 200);
const INBOUND_TEXT: Style = Style::new().bg(40, 40, 46).fg(255, 255, 255);
const INBOUND_CLOCK: Style = Style::new().bg(40, 40, 46).fg(190, 190, 200);
const DAY_SEPARATOR: Style = Style::new().dim().fg(150, 150, 150);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    pub fn from_outgoing(outgoing: bool) -> Self {
        if outgoing {
            Direction::Outbound
        } else {
            Direction::Inbound
        }
    }
}

pub fn render_bubble(text: &str, clock: &str, direction: Direction) -> Vec<StyledLine> {
    let (text_style, clock_style) = match direction {
        Direction::Outbound => (OUTBOUND_TEXT, OUTBOUND_CLOCK),
        Direction::Inbound => (INBOUND_TEXT, INBOUND_CLOCK),
    };

    let wrapped = wrap(text, BUBBLE_TEXT_WIDTH);
    let content_width = wrapped
        .iter()
        .map(|line| visible_length(line))
        .chain(std::iter::once(visible_length(clock)))
        .max()
        .unwrap_or(0);

    let mut lines: Vec<StyledLine> = wrapped
        .iter()
        .map(|line| StyledLine::styled(format!(" {} ", pad_right(line, content_width)), text_style))
        .collect();
    lines.push(StyledLine::styled(
        format!(" {} ", pad_left(clock, content_width)),
        clock_style,
    ));

    match direction {
        Direction::Outbound => lines.into_iter().map(|line| line.pad_left(VIEW_WIDTH)).collect(),
        Direction::Inbound => lines,
    }
}

/// Takes messages newest first, as the service returns them.
pub fn render_history<Tz: TimeZone>(messages: &[Message], tz: &Tz) -> Vec<StyledLine> {
    let mut lines = Vec::new();
    let mut last_day_key: Option<String> = None;

    for message in messages.iter().rev() {
        let Some(text) = message.display_text() else {
            continue;
        };

        if let Some(day_key) = dates::day_key_in(message.date, tz) {
            if last_day_key.as_deref() != Some(day_key.as_str()) {
                if let Some(label) = dates::day_label_in(message.date, tz) {
                    let separator = format!("--- {label} ---");
                    lines.push(StyledLine::styled(center(&separator, VIEW_WIDTH), DAY_SEPARATOR));
                }
                last_day_key = Some(day_key);
            }
        }

        let compact = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let clock = dates::format_clock_in(message.date, tz);
        lines.extend(render_bubble(
            &compact,
            &clock,
            Direction::from_outgoing(message.outgoing),
        ));
    }

    lines
}
