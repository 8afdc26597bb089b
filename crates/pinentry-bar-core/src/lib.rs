//! Core of pinentry-bar, a single-line PIN and confirmation prompt.
//!
//! This crate holds everything that decides what the prompt does: the
//! secret buffer, bar placement, keyboard acquisition, the input session
//! state machine, and the session loop. It is intentionally UI-agnostic to
//! allow:
//!
//! - Security audits to focus on core modules
//! - Unit tests without a display or a terminal
//! - Different front ends behind the [`traits`] seams
//!
//! # Modules
//!
//! - [`types`]: Core data types (`PromptRequest`, `Phase`, `RenderRequest`, geometry)
//! - [`buffer`]: Locked, zeroized, rune-aware secret buffer
//! - [`placement`]: Monitor selection and bar geometry
//! - [`grab`]: Bounded exclusive-input acquisition
//! - [`clipboard`]: Selection requests and paste insertion
//! - [`timeout`]: Session watchdog
//! - [`session`]: The input session state machine
//! - [`runner`]: The session loop
//! - [`protocol`]: Result hand-off (`Outcome`, `ResponseSlot`)
//! - [`config`]: TOML configuration
//! - [`traits`]: Collaborator traits (`DrawSurface`, `EventSource`, ...)
//! - [`mock`]: Mock collaborators for tests
//!
//! # Example
//!
//! ```
//! use pinentry_bar_core::{InputSession, PromptRequest, SessionEvent, SessionOptions, Outcome};
//! use secrecy::ExposeSecret;
//!
//! let request = PromptRequest {
//!     prompt: "PIN:".to_string(),
//!     ..Default::default()
//! };
//! let mut session = InputSession::new(&request, &SessionOptions::default());
//!
//! for c in "1234".chars() {
//!     session.handle(SessionEvent::KeyChar(c.to_string()));
//! }
//! session.handle(SessionEvent::KeyConfirm);
//!
//! match session.finish() {
//!     Outcome::Pin(pin) => assert_eq!(pin.expose_secret(), "1234"),
//!     other => panic!("unexpected outcome: {:?}", other),
//! }
//! ```

pub mod buffer;
pub mod clipboard;
pub mod config;
pub mod grab;
pub mod mock;
pub mod placement;
pub mod protocol;
pub mod runner;
pub mod session;
pub mod timeout;
pub mod traits;
pub mod types;

// Re-export commonly used types at the crate root for convenience
pub use buffer::{Direction, SecureBuffer};
pub use clipboard::{ClipboardBridge, PasteResult};
pub use config::{Config, ConfigError};
pub use grab::{acquire_exclusive_input, GrabError, GrabPolicy};
pub use placement::{place_bar, resolve_geometry, select_monitor, PlacementInput};
pub use protocol::{Outcome, ResponseSlot, STATUS_NOT_OK, STATUS_OK};
pub use runner::{run_prompt, Collaborators, SessionError};
pub use session::{Effect, InputSession, SessionEvent};
pub use timeout::TimeoutGuard;
pub use traits::{
    DrawSurface, EventSource, GeometryError, GeometryQuery, InputGrabber, SelectionError,
    SelectionSource, SurfaceError, TextMeasure,
};
pub use types::{
    BarGeometry, MonitorRect, Phase, Point, PromptMode, PromptRequest, RenderRequest,
    SessionOptions,
};
