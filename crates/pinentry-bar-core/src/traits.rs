//! Trait definitions for the prompt's collaborators.
//!
//! These traits define the interfaces for:
//! - Drawing the bar and measuring text (window system / terminal)
//! - Delivering input events
//! - Acquiring exclusive keyboard input
//! - Querying monitor and window geometry
//! - Requesting the clipboard selection
//!
//! The core never talks to a display directly, so the session can be tested
//! with mock implementations and different front ends can be swapped in.

use std::future::Future;
use std::pin::Pin;

use crate::session::SessionEvent;
use crate::types::{BarGeometry, MonitorRect, Point, RenderRequest};

/// Error type for draw surface operations.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// No rendering resource could be initialized.
    #[error("draw surface initialization failed: {0}")]
    InitializationFailed(String),

    /// Drawing to an initialized surface failed.
    #[error("draw failed: {0}")]
    Draw(#[source] std::io::Error),
}

/// Error type for geometry queries.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// The monitor layout could not be queried.
    #[error("monitor query failed: {0}")]
    MonitorQuery(String),

    /// The embedding window's attributes could not be read.
    #[error("could not get embedding window attributes: {0}")]
    EmbeddingWindow(String),
}

/// Error type for selection requests.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    /// The selection could not be requested.
    #[error("selection request failed: {0}")]
    RequestFailed(String),
}

/// Text measurement offered by a draw surface.
pub trait TextMeasure {
    /// Width of `text` in surface units (pixels, terminal columns, ...).
    fn text_width(&self, text: &str) -> u32;
}

/// Trait for the surface the bar is drawn on.
///
/// A surface performs no mutation visible to the session: it only consumes
/// [`RenderRequest`]s.
pub trait DrawSurface: TextMeasure {
    /// Height of one bar line in surface units.
    fn bar_height(&self) -> u32;

    /// Create / position the bar window at `geometry`.
    fn map(&mut self, geometry: &BarGeometry) -> Result<(), SurfaceError>;

    /// Paint one frame.
    fn render(&mut self, request: &RenderRequest) -> Result<(), SurfaceError>;

    /// Raise the bar above windows that obscure it.
    fn raise(&mut self) -> Result<(), SurfaceError>;

    /// Take keyboard focus back after the host moved it elsewhere.
    fn reassert_focus(&mut self) -> Result<(), SurfaceError>;

    /// Tear the bar down. Called once when the session ends.
    fn close(&mut self) {}
}

/// Trait for input event delivery.
///
/// The session loop is single-threaded, so the returned future is not
/// required to be `Send`.
///
/// # Example (Mock Implementation)
///
/// ```ignore
/// struct ScriptedEvents {
///     events: VecDeque<SessionEvent>,
/// }
///
/// impl EventSource for ScriptedEvents {
///     fn next_event(&mut self) -> Pin<Box<dyn Future<Output = Option<SessionEvent>> + '_>> {
///         Box::pin(std::future::ready(self.events.pop_front()))
///     }
/// }
/// ```
pub trait EventSource {
    /// Wait for and return the next event.
    ///
    /// Returns `None` once the input source is closed; the session treats
    /// that as a cancellation.
    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = Option<SessionEvent>> + '_>>;
}

/// Trait for exclusive keyboard input acquisition.
///
/// Retries and the fatal-on-exhaustion policy live in
/// [`acquire_exclusive_input`](crate::grab::acquire_exclusive_input); an
/// implementation only makes single attempts.
pub trait InputGrabber {
    /// Make one attempt. Returns `true` once input is exclusively owned.
    fn try_grab(&mut self) -> bool;

    /// Give exclusive input back.
    fn release(&mut self) {}
}

/// Trait for monitor and window geometry queries.
pub trait GeometryQuery {
    /// Monitor rectangles in index order (possibly empty).
    fn monitors(&self) -> Result<Vec<MonitorRect>, GeometryError>;

    /// Rectangle of the top-level window holding input focus, if any.
    fn focus_window_rect(&self) -> Option<MonitorRect> {
        None
    }

    /// Pointer location in root coordinates, if it can be queried.
    fn pointer(&self) -> Option<Point> {
        None
    }

    /// Rectangle of the embedding window (the root window when not embedded).
    fn embedding_rect(&self) -> Result<MonitorRect, GeometryError>;
}

/// Trait for clipboard selection requests.
///
/// The payload arrives later as
/// [`SessionEvent::Paste`](crate::session::SessionEvent::Paste).
pub trait SelectionSource {
    /// Ask for the current selection as text, at most `max_bytes` long.
    fn request_selection(&mut self, max_bytes: usize) -> Result<(), SelectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_error_display() {
        assert_eq!(
            SurfaceError::InitializationFailed("no fonts could be loaded".into()).to_string(),
            "draw surface initialization failed: no fonts could be loaded"
        );
    }

    #[test]
    fn geometry_error_display() {
        assert_eq!(
            GeometryError::EmbeddingWindow("0x1a00003".into()).to_string(),
            "could not get embedding window attributes: 0x1a00003"
        );
    }

    #[test]
    fn default_geometry_queries_return_none() {
        struct RootOnly;

        impl GeometryQuery for RootOnly {
            fn monitors(&self) -> Result<Vec<MonitorRect>, GeometryError> {
                Ok(Vec::new())
            }

            fn embedding_rect(&self) -> Result<MonitorRect, GeometryError> {
                Ok(MonitorRect::new(0, 0, 640, 480))
            }
        }

        let query = RootOnly;
        assert!(query.focus_window_rect().is_none());
        assert!(query.pointer().is_none());
    }
}
