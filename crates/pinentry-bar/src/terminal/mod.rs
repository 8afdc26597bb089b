//! Terminal front end.
//!
//! This module implements the collaborator traits of `pinentry-bar-core` on
//! a tty:
//!
//! - [`TerminalSurface`]: draws the bar on the alternate screen
//! - [`TerminalEvents`]: crossterm input as session events
//! - [`TtyGrab`]: exclusive use of the terminal device
//! - [`TerminalGeometry`]: the terminal window as the bar's only area
//! - [`TerminalSelection`]: paste requests (bracketed paste does the work)

mod events;
mod surface;
mod tty;

use std::io;
use std::path::Path;

use pinentry_bar_core::{Collaborators, PromptMode};

pub use events::{translate, TerminalEvents};
pub use surface::{layout, BarLine, TerminalSurface};
pub use tty::{TerminalGeometry, TerminalSelection, TtyDevice, TtyGrab, DEFAULT_TTY};

/// Collaborators backed by a terminal.
pub type TerminalCollaborators =
    Collaborators<TerminalSurface, TerminalEvents, TtyGrab, TerminalGeometry, TerminalSelection>;

/// Open the terminal at `tty` (default `/dev/tty`) for a `mode` prompt.
///
/// Nothing is drawn yet; the terminal is set up when the session maps the
/// bar.
pub fn open(tty: Option<&Path>, mode: PromptMode) -> io::Result<TerminalCollaborators> {
    let device = TtyDevice::open(tty)?;
    let events = TerminalEvents::new(mode)?;

    Ok(Collaborators {
        surface: TerminalSurface::new(device.try_clone()?),
        events,
        grabber: device.grabber()?,
        geometry: device.geometry()?,
        selection: TerminalSelection::new(),
    })
}
