//! Mock collaborators for testing.
//!
//! This module provides configurable implementations of every collaborator
//! trait in [`crate::traits`], so sessions can be driven end to end without a
//! display or a terminal.
//!
//! # Example
//!
//! ```
//! use pinentry_bar_core::mock::{MockGrabber, MockSurface, ScriptedEvents};
//! use pinentry_bar_core::SessionEvent;
//!
//! // A surface that records every frame
//! let surface = MockSurface::new();
//!
//! // A user typing "42" and pressing Enter
//! let events = ScriptedEvents::typing("42").then(SessionEvent::KeyConfirm);
//!
//! // A keyboard that is busy for the first three attempts
//! let grabber = MockGrabber::succeed_after(3);
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::session::SessionEvent;
use crate::traits::{
    DrawSurface, EventSource, GeometryError, GeometryQuery, InputGrabber, SelectionError,
    SelectionSource, SurfaceError, TextMeasure,
};
use crate::types::{BarGeometry, MonitorRect, Point, RenderRequest};

/// A draw surface that records what it is asked to do.
///
/// Text is measured as [`MockSurface::UNITS_PER_CHAR`] units per `char`.
#[derive(Debug, Default)]
pub struct MockSurface {
    renders: Vec<RenderRequest>,
    maps: Vec<BarGeometry>,
    raises: usize,
    focus_reasserts: usize,
    closes: usize,
    fail_map: bool,
}

impl MockSurface {
    /// Width of one `char` in surface units.
    pub const UNITS_PER_CHAR: u32 = 8;

    /// Height of the bar in surface units.
    pub const BAR_HEIGHT: u32 = 20;

    pub fn new() -> Self {
        Self::default()
    }

    /// Create a surface whose `map` fails (no usable font / terminal).
    pub fn failing() -> Self {
        Self {
            fail_map: true,
            ..Self::default()
        }
    }

    /// Every frame painted so far.
    pub fn renders(&self) -> &[RenderRequest] {
        &self.renders
    }

    /// The most recent frame.
    pub fn last_render(&self) -> Option<&RenderRequest> {
        self.renders.last()
    }

    /// Geometries passed to `map`.
    pub fn maps(&self) -> &[BarGeometry] {
        &self.maps
    }

    pub fn raises(&self) -> usize {
        self.raises
    }

    pub fn focus_reasserts(&self) -> usize {
        self.focus_reasserts
    }

    pub fn closes(&self) -> usize {
        self.closes
    }
}

impl TextMeasure for MockSurface {
    fn text_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * Self::UNITS_PER_CHAR
    }
}

impl DrawSurface for MockSurface {
    fn bar_height(&self) -> u32 {
        Self::BAR_HEIGHT
    }

    fn map(&mut self, geometry: &BarGeometry) -> Result<(), SurfaceError> {
        if self.fail_map {
            return Err(SurfaceError::InitializationFailed(
                "mock surface configured to fail".to_string(),
            ));
        }
        self.maps.push(*geometry);
        Ok(())
    }

    fn render(&mut self, request: &RenderRequest) -> Result<(), SurfaceError> {
        self.renders.push(request.clone());
        Ok(())
    }

    fn raise(&mut self) -> Result<(), SurfaceError> {
        self.raises += 1;
        Ok(())
    }

    fn reassert_focus(&mut self) -> Result<(), SurfaceError> {
        self.focus_reasserts += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}

/// An event source replaying a fixed script.
///
/// Once the script is exhausted the source either reports end of input
/// (`None`, the default) or hangs forever, which is what a user who walked
/// away looks like.
#[derive(Debug, Default)]
pub struct ScriptedEvents {
    events: VecDeque<SessionEvent>,
    hang_when_empty: bool,
    delay: Option<Duration>,
    delivered: usize,
}

impl ScriptedEvents {
    pub fn new(events: impl IntoIterator<Item = SessionEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            ..Self::default()
        }
    }

    /// One `KeyChar` per char of `text`.
    pub fn typing(text: &str) -> Self {
        Self::new(text.chars().map(|c| SessionEvent::KeyChar(c.to_string())))
    }

    /// Append `event` to the script.
    pub fn then(mut self, event: SessionEvent) -> Self {
        self.events.push_back(event);
        self
    }

    /// Never resolve once the script is exhausted.
    pub fn then_hang(mut self) -> Self {
        self.hang_when_empty = true;
        self
    }

    /// Wait `delay` before delivering each event.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of events handed out so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Events not yet handed out.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for ScriptedEvents {
    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = Option<SessionEvent>> + '_>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.events.pop_front() {
                Some(event) => {
                    self.delivered += 1;
                    Some(event)
                }
                None if self.hang_when_empty => std::future::pending().await,
                None => None,
            }
        })
    }
}

/// An input grabber that succeeds after a configurable number of attempts.
#[derive(Debug)]
pub struct MockGrabber {
    succeed_on: Option<u32>,
    attempts: u32,
    grabbed: bool,
    releases: usize,
}

impl MockGrabber {
    /// Succeed on the first attempt.
    pub fn new() -> Self {
        Self::succeed_after(0)
    }

    /// Fail `failures` times, then succeed.
    pub fn succeed_after(failures: u32) -> Self {
        Self {
            succeed_on: Some(failures + 1),
            attempts: 0,
            grabbed: false,
            releases: 0,
        }
    }

    /// Never succeed (another client holds the keyboard).
    pub fn never() -> Self {
        Self {
            succeed_on: None,
            attempts: 0,
            grabbed: false,
            releases: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl Default for MockGrabber {
    fn default() -> Self {
        Self::new()
    }
}

impl InputGrabber for MockGrabber {
    fn try_grab(&mut self) -> bool {
        self.attempts += 1;
        self.grabbed = self.succeed_on.is_some_and(|n| self.attempts >= n);
        self.grabbed
    }

    fn release(&mut self) {
        if self.grabbed {
            self.releases += 1;
        }
        self.grabbed = false;
    }
}

/// Geometry with a fixed monitor layout.
#[derive(Debug, Clone)]
pub struct MockGeometry {
    root: MonitorRect,
    monitors: Vec<MonitorRect>,
    focus: Option<MonitorRect>,
    pointer: Option<Point>,
    fail: bool,
}

impl MockGeometry {
    /// No monitors; `root` is the embedding rectangle.
    pub fn new(root: MonitorRect) -> Self {
        Self {
            root,
            monitors: Vec::new(),
            focus: None,
            pointer: None,
            fail: false,
        }
    }

    /// Every query fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(MonitorRect::new(0, 0, 0, 0))
        }
    }

    pub fn with_monitors(mut self, monitors: Vec<MonitorRect>) -> Self {
        self.monitors = monitors;
        self
    }

    pub fn with_focus(mut self, focus: MonitorRect) -> Self {
        self.focus = Some(focus);
        self
    }

    pub fn with_pointer(mut self, pointer: Point) -> Self {
        self.pointer = Some(pointer);
        self
    }
}

impl GeometryQuery for MockGeometry {
    fn monitors(&self) -> Result<Vec<MonitorRect>, GeometryError> {
        if self.fail {
            return Err(GeometryError::MonitorQuery("mock geometry".to_string()));
        }
        Ok(self.monitors.clone())
    }

    fn focus_window_rect(&self) -> Option<MonitorRect> {
        self.focus
    }

    fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    fn embedding_rect(&self) -> Result<MonitorRect, GeometryError> {
        if self.fail {
            return Err(GeometryError::EmbeddingWindow("mock geometry".to_string()));
        }
        Ok(self.root)
    }
}

/// A selection source that records requests.
#[derive(Debug, Default)]
pub struct MockSelection {
    requests: Vec<usize>,
    fail: bool,
}

impl MockSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request fails (no selection owner).
    pub fn failing() -> Self {
        Self {
            requests: Vec::new(),
            fail: true,
        }
    }

    /// `max_bytes` of every request made so far.
    pub fn requests(&self) -> &[usize] {
        &self.requests
    }
}

impl SelectionSource for MockSelection {
    fn request_selection(&mut self, max_bytes: usize) -> Result<(), SelectionError> {
        self.requests.push(max_bytes);
        if self.fail {
            return Err(SelectionError::RequestFailed("no selection owner".to_string()));
        }
        Ok(())
    }
}
