//! Core types for pinentry-bar.
//!
//! This module contains the data structures shared by every part of the
//! prompt: the prompt mode and session phase, the request descriptor handed
//! over by the caller, window geometry, and the render request consumed by a
//! draw surface.

use std::time::Duration;

use serde::Deserialize;

use crate::buffer::DEFAULT_CAPACITY;
use crate::grab::GrabPolicy;

/// What the prompt asks the user for.
///
/// The mode is fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// Collect a secret (password or PIN).
    Password,
    /// Ask a yes/no question.
    Confirm,
}

impl std::fmt::Display for PromptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptMode::Password => write!(f, "password"),
            PromptMode::Confirm => write!(f, "confirm"),
        }
    }
}

/// Lifecycle of an input session.
///
/// Transitions are monotonic: `Active` moves to exactly one of the terminal
/// phases and never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for input.
    Active,
    /// The user accepted (entered a PIN or answered the question).
    Accepted,
    /// The user, or the input source, cancelled.
    Canceled,
    /// The timeout guard fired before the user answered.
    TimedOut,
}

impl Phase {
    /// Whether no further transition is possible from this phase.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Phase::Active)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Active => write!(f, "active"),
            Phase::Accepted => write!(f, "accepted"),
            Phase::Canceled => write!(f, "canceled"),
            Phase::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// A point in root-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A monitor (or window) rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl MonitorRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area shared by `self` and `other`, zero when they do not overlap.
    pub fn intersection_area(&self, other: &MonitorRect) -> u64 {
        let left = i64::from(self.x).max(i64::from(other.x));
        let top = i64::from(self.y).max(i64::from(other.y));
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        let width = (right - left).max(0) as u64;
        let height = (bottom - top).max(0) as u64;
        width * height
    }

    /// Whether `point` lies inside the rectangle (right/bottom edges excluded).
    pub fn contains(&self, point: Point) -> bool {
        let x = i64::from(point.x);
        let y = i64::from(point.y);
        x >= i64::from(self.x) && x < self.right() && y >= i64::from(self.y) && y < self.bottom()
    }

    fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }
}

/// Final position and size of the prompt bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Everything a draw surface needs to paint one frame.
///
/// In password mode `display` only ever holds marker glyphs, never buffer
/// content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Primary prompt (e.g. "PIN:").
    pub prompt: String,
    /// Secondary prompt / description supplied by the caller.
    pub description: String,
    /// Masked content in password mode, the `(y/n)` affordance in confirm mode.
    pub display: String,
    /// Offset of the cursor from the start of `display`, in surface units.
    /// `None` when no cursor is drawn.
    pub cursor_offset: Option<u32>,
    /// Mode of the session that produced the request.
    pub mode: PromptMode,
}

/// Request descriptor handed over by the protocol handler.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// Display / window-system identifier (for the terminal front end, the
    /// tty device path).
    pub display: Option<String>,

    /// Embedding window. When set, the session renders inside the host and
    /// does not take exclusive input.
    pub embed: Option<u64>,

    /// Primary prompt text.
    pub prompt: String,

    /// Secondary prompt text.
    pub description: String,

    /// Watchdog timeout. Zero disables it.
    pub timeout: Duration,

    /// Password or confirmation prompt.
    pub mode: PromptMode,

    /// Explicit monitor index override.
    pub monitor: Option<usize>,
}

impl Default for PromptRequest {
    fn default() -> Self {
        Self {
            display: None,
            embed: None,
            prompt: String::new(),
            description: String::new(),
            timeout: Duration::ZERO,
            mode: PromptMode::Password,
            monitor: None,
        }
    }
}

impl PromptRequest {
    /// Whether the session runs inside a host-provided window.
    pub fn is_embedded(&self) -> bool {
        self.embed.is_some()
    }
}

/// Per-installation settings of the session, usually built from
/// [`Config`](crate::config::Config).
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Installation prompt, drawn ahead of the request's own prompt.
    pub bar_prompt: String,
    /// Glyph sequence shown once per rune of the secret.
    pub marker: String,
    /// Anchor the bar at the top of the chosen monitor.
    pub top_bar: bool,
    /// SecureBuffer capacity in bytes.
    pub capacity: usize,
    /// Exclusive input acquisition policy.
    pub grab: GrabPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            bar_prompt: String::new(),
            marker: "*".to_string(),
            top_bar: true,
            capacity: DEFAULT_CAPACITY,
            grab: GrabPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_terminality() {
        assert!(!Phase::Active.is_terminal());
        assert!(Phase::Accepted.is_terminal());
        assert!(Phase::Canceled.is_terminal());
        assert!(Phase::TimedOut.is_terminal());
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::Active.to_string(), "active");
        assert_eq!(Phase::TimedOut.to_string(), "timed_out");
    }

    #[test]
    fn prompt_mode_serde_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: PromptMode,
        }

        let parsed: Wrapper = toml::from_str("mode = \"confirm\"").unwrap();
        assert_eq!(parsed.mode, PromptMode::Confirm);
        assert_eq!(PromptMode::Password.to_string(), "password");
    }

    #[test]
    fn intersection_area_of_overlapping_rects() {
        let a = MonitorRect::new(0, 0, 1000, 800);
        let window = MonitorRect::new(900, 100, 300, 300);
        assert_eq!(a.intersection_area(&window), 100 * 300);
    }

    #[test]
    fn intersection_area_of_disjoint_rects_is_zero() {
        let a = MonitorRect::new(0, 0, 100, 100);
        let b = MonitorRect::new(200, 200, 50, 50);
        assert_eq!(a.intersection_area(&b), 0);

        // Touching edges do not overlap.
        let c = MonitorRect::new(100, 0, 100, 100);
        assert_eq!(a.intersection_area(&c), 0);
    }

    #[test]
    fn contains_excludes_far_edges() {
        let rect = MonitorRect::new(10, 10, 20, 20);
        assert!(rect.contains(Point::new(10, 10)));
        assert!(rect.contains(Point::new(29, 29)));
        assert!(!rect.contains(Point::new(30, 10)));
        assert!(!rect.contains(Point::new(9, 15)));
    }

    #[test]
    fn prompt_request_default() {
        let request = PromptRequest::default();
        assert_eq!(request.mode, PromptMode::Password);
        assert_eq!(request.timeout, Duration::ZERO);
        assert!(!request.is_embedded());
        assert!(request.monitor.is_none());
    }

    #[test]
    fn session_options_default() {
        let options = SessionOptions::default();
        assert_eq!(options.marker, "*");
        assert!(options.top_bar);
        assert_eq!(options.capacity, DEFAULT_CAPACITY);
    }
}
