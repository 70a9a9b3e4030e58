// Centred overlay boxes for notices and round banners

use std::time::{Duration, Instant};

use ratatui::{
    layout::{Alignment, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::client::{Notice, Outcome};
use crate::network::ConnectError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStyle {
    Info,
    Warning,
    Error,
    Success,
}

impl OverlayStyle {
    fn border_color(self) -> Color {
        match self {
            OverlayStyle::Info => Color::Cyan,
            OverlayStyle::Warning => Color::Yellow,
            OverlayStyle::Error => Color::Red,
            OverlayStyle::Success => Color::Green,
        }
    }

    fn text_color(self) -> Color {
        match self {
            OverlayStyle::Info => Color::White,
            OverlayStyle::Warning => Color::Yellow,
            OverlayStyle::Error => Color::LightRed,
            OverlayStyle::Success => Color::LightGreen,
        }
    }
}

/// A message box drawn over the board, optionally dismissed after a while
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayMessage {
    pub lines: Vec<String>,
    pub title: Option<String>,
    pub style: OverlayStyle,
    pub expires_at: Option<Instant>,
}

impl OverlayMessage {
    pub fn new(style: OverlayStyle, text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            title: None,
            style,
            expires_at: None,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(OverlayStyle::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(OverlayStyle::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(OverlayStyle::Error, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(OverlayStyle::Success, text)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    /// Hide the overlay `ttl` after `now`
    pub fn lasting(mut self, ttl: Duration, now: Instant) -> Self {
        self.expires_at = Some(now + ttl);
        self
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

impl From<&Notice> for OverlayMessage {
    fn from(notice: &Notice) -> Self {
        let text = notice.to_string();
        match notice {
            Notice::Connected(_) => OverlayMessage::success(text),
            Notice::OtherPlayerQuit => OverlayMessage::warning(text),
            Notice::ServerShutDown | Notice::ConnectionLost => OverlayMessage::error(text),
        }
    }
}

impl From<Outcome> for OverlayMessage {
    fn from(outcome: Outcome) -> Self {
        let style = match outcome {
            Outcome::Won => OverlayStyle::Success,
            Outcome::Lost => OverlayStyle::Error,
            Outcome::Draw => OverlayStyle::Info,
        };
        OverlayMessage::new(style, outcome.banner())
    }
}

impl From<&ConnectError> for OverlayMessage {
    fn from(error: &ConnectError) -> Self {
        OverlayMessage::error(error.to_string()).with_title("Connection failed")
    }
}

pub fn render_overlay(frame: &mut Frame, message: &OverlayMessage, area: Rect) {
    let widest = message
        .lines
        .iter()
        .map(|line| line.chars().count())
        .chain(message.title.iter().map(|t| t.chars().count() + 2))
        .max()
        .unwrap_or(0);

    let width = (widest as u16 + 6).min(area.width.saturating_sub(2));
    let height = (message.lines.len() as u16 + 4).min(area.height.saturating_sub(2));
    let overlay_area = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    frame.render_widget(Clear, overlay_area);

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(message.style.border_color()))
        .style(Style::default().bg(Color::Rgb(20, 20, 20)));
    if let Some(ref title) = message.title {
        block = block.title(format!(" {} ", title));
    }
    frame.render_widget(block, overlay_area);

    let text: Vec<Line> = message
        .lines
        .iter()
        .map(|line| {
            Line::from(Span::styled(
                line.clone(),
                Style::default()
                    .fg(message.style.text_color())
                    .add_modifier(Modifier::BOLD),
            ))
        })
        .collect();
    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center),
        overlay_area.inner(Margin::new(2, 1)),
    );
}
