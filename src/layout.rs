//! Terminal text layout. Widths are display columns of the text with color
//! escapes (`ESC [ ... m`) removed.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

static ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid escape regex"));

static CONTROL_SEQUENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?|\x1b\[[0-?]*[ -/]*[@-~]|\x1b[@-_]?")
        .expect("valid control sequence regex")
});

pub fn strip_escapes(value: &str) -> Cow<'_, str> {
    ESCAPE_RE.replace_all(value, "")
}

pub fn visible_length(value: &str) -> usize {
    UnicodeWidthStr::width(strip_escapes(value).as_ref())
}

/// Drops terminal control sequences and control characters from text that
/// came from other users. Newlines and tabs are kept.
pub fn sanitize(value: &str) -> String {
    CONTROL_SEQUENCE_RE
        .replace_all(value, "")
        .chars()
        .filter(|ch| matches!(ch, '\n' | '\t') || !ch.is_control())
        .collect()
}

pub fn sanitize_line(value: &str) -> String {
    sanitize(value).replace(['\n', '\t'], " ")
}

/// Never truncates.
pub fn pad_right(value: &str, width: usize) -> String {
    let mut output = value.to_string();
    let current = visible_length(value);
    if current < width {
        output.push_str(&" ".repeat(width - current));
    }
    output
}

pub fn pad_left(value: &str, width: usize) -> String {
    let current = visible_length(value);
    if current >= width {
        return value.to_string();
    }
    let mut output = " ".repeat(width - current);
    output.push_str(value);
    output
}

/// Odd deficits put the extra space on the right.
pub fn center(value: &str, width: usize) -> String {
    let current = visible_length(value);
    if current >= width {
        return value.to_string();
    }
    let deficit = width - current;
    let left = deficit / 2;
    let right = deficit - left;
    format!("{}{value}{}", " ".repeat(left), " ".repeat(right))
}

/// Greedy word wrap. Whitespace runs collapse; words wider than `width` are
/// hard-split and the last partial chunk keeps packing with later words.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = visible_length(word);

        if !current.is_empty() {
            if current_len + 1 + word_len <= width {
                current.push(' ');
                current.push_str(word);
                current_len += 1 + word_len;
                continue;
            }
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if word_len <= width {
            current = word.to_string();
            current_len = word_len;
            continue;
        }

        let mut chunks = split_visible(word, width);
        let Some(last) = chunks.pop() else {
            continue;
        };
        lines.extend(chunks);
        let last_len = visible_length(&last);
        if last_len == width {
            lines.push(last);
        } else {
            current = last;
            current_len = last_len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// Escape sequences stay attached to the chunk they occur in.
fn split_visible(word: &str, width: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    let mut count = 0usize;
    let mut rest = word;

    while !rest.is_empty() {
        if rest.starts_with('\x1b') {
            if let Some(found) = ESCAPE_RE.find(rest).filter(|found| found.start() == 0) {
                chunk.push_str(found.as_str());
                rest = &rest[found.end()..];
                continue;
            }
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if count > 0 && count + ch_width > width {
            chunks.push(std::mem::take(&mut chunk));
            count = 0;
        }
        chunk.push(ch);
        count += ch_width;
        rest = &rest[ch.len_utf8()..];
    }

    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}
