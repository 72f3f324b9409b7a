use std::env;

use crate::layout;

const ESC: &str = "\x1b[";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Foreground, background and weight for a run of text. Turned into escape
/// sequences only by [`Painter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Style {
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
    pub bold: bool,
    pub dim: bool,
}

impl Style {
    pub const fn new() -> Self {
        Self {
            fg: None,
            bg: None,
            bold: false,
            dim: false,
        }
    }

    pub const fn fg(mut self, r: u8, g: u8, b: u8) -> Self {
        self.fg = Some(Rgb(r, g, b));
        self
    }

    pub const fn bg(mut self, r: u8, g: u8, b: u8) -> Self {
        self.bg = Some(Rgb(r, g, b));
        self
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub const fn dim(mut self) -> Self {
        self.dim = true;
        self
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::new()
    }

    fn prefix(&self) -> String {
        let mut out = String::new();
        if self.bold {
            out.push_str(ESC);
            out.push_str("1m");
        }
        if self.dim {
            out.push_str(ESC);
            out.push_str("2m");
        }
        if let Some(Rgb(r, g, b)) = self.bg {
            out.push_str(&format!("{ESC}48;2;{r};{g};{b}m"));
        }
        if let Some(Rgb(r, g, b)) = self.fg {
            out.push_str(&format!("{ESC}38;2;{r};{g};{b}m"));
        }
        out
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Colors are on unless `--no-color` was passed or `NO_COLOR` is set.
    pub fn detect(no_color: bool) -> Self {
        let env_disabled = env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
        Self::new(!no_color && !env_disabled)
    }

    pub fn paint(&self, text: &str, style: Style) -> String {
        if !self.enabled || style.is_plain() {
            return text.to_string();
        }
        format!("{}{text}{ESC}0m", style.prefix())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyledLine {
    pub spans: Vec<Span>,
}

impl StyledLine {
    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        Self {
            spans: vec![Span {
                text: text.into(),
                style,
            }],
        }
    }

    pub fn visible_length(&self) -> usize {
        self.spans
            .iter()
            .map(|span| layout::visible_length(&span.text))
            .sum()
    }

    pub fn pad_left(mut self, width: usize) -> Self {
        let current = self.visible_length();
        if current < width {
            self.spans.insert(
                0,
                Span {
                    text: " ".repeat(width - current),
                    style: Style::new(),
                },
            );
        }
        self
    }

    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    pub fn render(&self, painter: Painter) -> String {
        if !painter.enabled {
            return self.plain_text();
        }
        self.spans
            .iter()
            .map(|span| painter.paint(&span.text, span.style))
            .collect()
    }
}
