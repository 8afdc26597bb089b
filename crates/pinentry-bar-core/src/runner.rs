//! The session loop.
//!
//! [`run_prompt`] drives one [`InputSession`] from start to finish against a
//! set of [`Collaborators`]:
//!
//! 1. Acquire exclusive input (skipped when embedded).
//! 2. Place and map the bar, paint the first frame.
//! 3. Arm the [`TimeoutGuard`].
//! 4. Dispatch events until the session reaches a terminal phase.
//! 5. Close the bar, release input, hand back the [`Outcome`].
//!
//! The timeout flag is checked before waiting for an event and again after
//! one arrives. The guard's wake-up is itself a wake source, so an idle user
//! cannot keep the loop from noticing the timeout.

use tracing::{debug, trace, warn};

use crate::grab::{acquire_exclusive_input, GrabError};
use crate::placement::resolve_geometry;
use crate::protocol::Outcome;
use crate::session::{Effect, InputSession, SessionEvent};
use crate::timeout::TimeoutGuard;
use crate::traits::{
    DrawSurface, EventSource, GeometryError, GeometryQuery, InputGrabber, SelectionSource,
    SurfaceError,
};
use crate::types::{PromptRequest, SessionOptions};

/// Fatal session errors.
///
/// Each one means the prompt cannot uphold its guarantees; the caller must
/// not retry silently.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Exclusive input could not be acquired.
    #[error(transparent)]
    Grab(#[from] GrabError),

    /// The monitor layout or embedding window could not be queried.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// The bar could not be created or drawn.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Everything a session talks to.
pub struct Collaborators<D, E, G, Q, S> {
    pub surface: D,
    pub events: E,
    pub grabber: G,
    pub geometry: Q,
    pub selection: S,
}

/// Run one prompt.
///
/// # Errors
///
/// Returns [`SessionError`] for the fatal conditions: input could not be
/// grabbed, geometry could not be queried, or the surface failed. The bar is
/// closed and input released before returning, on success and on error.
pub async fn run_prompt<D, E, G, Q, S>(
    request: &PromptRequest,
    options: &SessionOptions,
    collaborators: &mut Collaborators<D, E, G, Q, S>,
) -> Result<Outcome, SessionError>
where
    D: DrawSurface,
    E: EventSource,
    G: InputGrabber,
    Q: GeometryQuery,
    S: SelectionSource,
{
    let embedded = request.is_embedded();
    if embedded {
        debug!("Embedded session, skipping exclusive input");
    } else {
        acquire_exclusive_input(&mut collaborators.grabber, &options.grab)?;
    }

    let result = drive(request, options, collaborators).await;

    collaborators.surface.close();
    if !embedded {
        collaborators.grabber.release();
    }

    match &result {
        Ok(outcome) => debug!(?outcome, "Prompt finished"),
        Err(e) => warn!(error = %e, "Prompt failed"),
    }
    result
}

async fn drive<D, E, G, Q, S>(
    request: &PromptRequest,
    options: &SessionOptions,
    c: &mut Collaborators<D, E, G, Q, S>,
) -> Result<Outcome, SessionError>
where
    D: DrawSurface,
    E: EventSource,
    G: InputGrabber,
    Q: GeometryQuery,
    S: SelectionSource,
{
    let embedded = request.is_embedded();
    let geometry = resolve_geometry(
        &c.geometry,
        request.monitor,
        embedded,
        options.top_bar,
        c.surface.bar_height(),
    )?;
    c.surface.map(&geometry)?;

    let mut session = InputSession::new(request, options);
    debug!(mode = %session.mode(), "Session started");
    render(&mut c.surface, &session)?;

    let guard = TimeoutGuard::arm(request.timeout);

    loop {
        if guard.has_fired() {
            session.handle(SessionEvent::TimeoutFired);
            break;
        }

        let event = tokio::select! {
            biased;
            _ = guard.expired() => continue,
            event = c.events.next_event() => event,
        };

        if guard.has_fired() {
            session.handle(SessionEvent::TimeoutFired);
            break;
        }

        let Some(event) = event else {
            debug!("Input source closed, cancelling");
            session.cancel();
            break;
        };

        match session.handle(event) {
            Effect::None => {}
            Effect::Render => render(&mut c.surface, &session)?,
            Effect::RaiseAndRender => {
                c.surface.raise()?;
                render(&mut c.surface, &session)?;
            }
            Effect::RequestSelection(clipboard) => {
                if let Err(e) = clipboard.request(&mut c.selection) {
                    warn!(error = %e, "Selection request failed");
                }
            }
            Effect::ReassertFocus => {
                if embedded {
                    c.surface.reassert_focus()?;
                } else {
                    trace!("Focus lost while holding exclusive input");
                }
            }
            Effect::Finished(_) => break,
        }
    }

    Ok(session.finish())
}

fn render<D: DrawSurface>(surface: &mut D, session: &InputSession) -> Result<(), SurfaceError> {
    let frame = session.render_request(&*surface);
    surface.render(&frame)
}
