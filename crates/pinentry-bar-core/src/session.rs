//! The input session state machine.
//!
//! An [`InputSession`] owns everything one prompt needs: the mode-specific
//! state (a [`SecureBuffer`] for passwords, a confirmation flag for yes/no
//! questions) and the [`Phase`]. Events go in through
//! [`InputSession::handle`]; what the caller has to do next comes back as an
//! [`Effect`]. The session never touches a display itself, so every
//! transition is testable without one.
//!
//! Transition tables:
//!
//! | Event                  | Password                    | Confirm                    |
//! |------------------------|-----------------------------|----------------------------|
//! | `KeyChar`              | insert at cursor            | -                          |
//! | `KeyMoveLeft/Right`    | move cursor one rune        | -                          |
//! | `KeyBackspace/Delete`  | delete rune before/at       | -                          |
//! | `KeyPaste`             | request selection           | -                          |
//! | `Paste`                | insert first line           | -                          |
//! | `KeyConfirm`           | Accepted, take secret       | Accepted, confirmed        |
//! | `KeyYes` / `KeyNo`     | -                           | Accepted, (not) confirmed  |
//! | `KeyEscape`            | Canceled, discard           | Canceled                   |
//! | `TimeoutFired`         | TimedOut, discard           | TimedOut                   |
//!
//! `Redraw`, `VisibilityLost` and `FocusLost` never change the phase. Once
//! the phase is terminal every event is ignored.

use std::fmt;

use secrecy::SecretString;
use tracing::{debug, info};

use crate::buffer::SecureBuffer;
use crate::clipboard::{ClipboardBridge, PasteResult};
use crate::protocol::Outcome;
use crate::traits::TextMeasure;
use crate::types::{Phase, PromptMode, PromptRequest, RenderRequest, SessionOptions};

/// Text shown instead of buffer content in confirm mode.
pub const CONFIRM_AFFORDANCE: &str = "(y/n)";

/// Input delivered to a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Text produced by a key press (one or more runes).
    KeyChar(String),
    KeyMoveLeft,
    KeyMoveRight,
    KeyBackspace,
    KeyDelete,
    /// Enter.
    KeyConfirm,
    /// Affirmative answer key (confirm mode).
    KeyYes,
    /// Negative answer key (confirm mode).
    KeyNo,
    KeyEscape,
    /// User asked to paste the selection.
    KeyPaste,
    /// The window needs repainting.
    Redraw,
    /// The window got obscured.
    VisibilityLost,
    /// Keyboard focus moved away from the window.
    FocusLost,
    /// Selection payload arrived.
    Paste(PasteResult),
    /// The watchdog expired.
    TimeoutFired,
}

/// What the caller must do after [`InputSession::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing changed.
    None,
    /// Paint a fresh [`RenderRequest`].
    Render,
    /// Raise the window, then paint.
    RaiseAndRender,
    /// Fire a selection request through the session's bridge.
    RequestSelection(ClipboardBridge),
    /// Take keyboard focus back.
    ReassertFocus,
    /// The session reached a terminal phase.
    Finished(Phase),
}

/// Mode-specific state.
enum ModeState {
    Password {
        buffer: SecureBuffer,
        clipboard: ClipboardBridge,
        secret: Option<SecretString>,
    },
    Confirm {
        confirmed: bool,
    },
}

/// One prompt, from construction to a terminal phase.
pub struct InputSession {
    prompt: String,
    description: String,
    marker: String,
    phase: Phase,
    state: ModeState,
}

impl InputSession {
    /// Create a session for `request`.
    pub fn new(request: &PromptRequest, options: &SessionOptions) -> Self {
        let prompt = match (options.bar_prompt.is_empty(), request.prompt.is_empty()) {
            (true, _) => request.prompt.clone(),
            (false, true) => options.bar_prompt.clone(),
            (false, false) => format!("{} {}", options.bar_prompt, request.prompt),
        };
        let state = match request.mode {
            PromptMode::Password => ModeState::Password {
                buffer: SecureBuffer::with_capacity(options.capacity),
                clipboard: ClipboardBridge::for_capacity(options.capacity),
                secret: None,
            },
            PromptMode::Confirm => ModeState::Confirm { confirmed: false },
        };

        Self {
            prompt,
            description: request.description.clone(),
            marker: options.marker.clone(),
            phase: Phase::Active,
            state,
        }
    }

    pub fn mode(&self) -> PromptMode {
        match self.state {
            ModeState::Password { .. } => PromptMode::Password,
            ModeState::Confirm { .. } => PromptMode::Confirm,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Apply `event` and report what the caller has to do.
    pub fn handle(&mut self, event: SessionEvent) -> Effect {
        if self.phase.is_terminal() {
            return Effect::None;
        }

        match event {
            SessionEvent::Redraw => Effect::Render,
            SessionEvent::VisibilityLost => Effect::RaiseAndRender,
            SessionEvent::FocusLost => Effect::ReassertFocus,
            SessionEvent::TimeoutFired => {
                self.finish_with(Phase::TimedOut);
                Effect::Finished(Phase::TimedOut)
            }
            SessionEvent::KeyEscape => {
                self.finish_with(Phase::Canceled);
                Effect::Finished(Phase::Canceled)
            }
            event => match self.state {
                ModeState::Password { .. } => self.handle_password(event),
                ModeState::Confirm { .. } => self.handle_confirm(event),
            },
        }
    }

    fn handle_password(&mut self, event: SessionEvent) -> Effect {
        let ModeState::Password {
            buffer, clipboard, ..
        } = &mut self.state
        else {
            return Effect::None;
        };

        match event {
            SessionEvent::KeyChar(text) => {
                if text.chars().next().is_some_and(|c| !c.is_control()) {
                    buffer.insert(&text);
                }
                Effect::Render
            }
            SessionEvent::KeyMoveLeft => {
                buffer.move_left();
                Effect::Render
            }
            SessionEvent::KeyMoveRight => {
                buffer.move_right();
                Effect::Render
            }
            SessionEvent::KeyBackspace => {
                buffer.delete_before();
                Effect::Render
            }
            SessionEvent::KeyDelete => {
                buffer.delete_at();
                Effect::Render
            }
            SessionEvent::KeyPaste => Effect::RequestSelection(*clipboard),
            SessionEvent::Paste(paste) => {
                clipboard.insert(buffer, paste);
                Effect::Render
            }
            SessionEvent::KeyConfirm => {
                self.finish_with(Phase::Accepted);
                Effect::Finished(Phase::Accepted)
            }
            _ => Effect::None,
        }
    }

    fn handle_confirm(&mut self, event: SessionEvent) -> Effect {
        let answer = match event {
            SessionEvent::KeyYes | SessionEvent::KeyConfirm => true,
            SessionEvent::KeyNo => false,
            _ => return Effect::None,
        };
        if let ModeState::Confirm { confirmed } = &mut self.state {
            *confirmed = answer;
        }
        self.finish_with(Phase::Accepted);
        Effect::Finished(Phase::Accepted)
    }

    /// Enter a terminal phase, moving or wiping the secret as required.
    fn finish_with(&mut self, phase: Phase) {
        if let ModeState::Password { buffer, secret, .. } = &mut self.state {
            if phase == Phase::Accepted {
                *secret = Some(buffer.take_secret());
            } else {
                buffer.discard();
            }
        }
        self.phase = phase;

        match phase {
            Phase::TimedOut => info!(mode = %self.mode(), "Prompt timed out"),
            _ => debug!(mode = %self.mode(), phase = %phase, "Session finished"),
        }
    }

    /// Cancel an active session (e.g. the input source went away).
    pub fn cancel(&mut self) {
        if !self.phase.is_terminal() {
            self.finish_with(Phase::Canceled);
        }
    }

    /// Build the frame for the current state.
    ///
    /// Password mode shows one marker per rune and places the cursor by
    /// measuring the markers up to the cursor's rune index, so multi-byte
    /// runes never skew it. Buffer content never leaves the session here.
    pub fn render_request<M: TextMeasure + ?Sized>(&self, measure: &M) -> RenderRequest {
        let (display, cursor_offset) = match &self.state {
            ModeState::Password { buffer, .. } => {
                let display = self.marker.repeat(buffer.rune_count());
                let prefix = self.marker.repeat(buffer.cursor_rune_index());
                (display, Some(measure.text_width(&prefix)))
            }
            ModeState::Confirm { .. } => (CONFIRM_AFFORDANCE.to_string(), None),
        };

        RenderRequest {
            prompt: self.prompt.clone(),
            description: self.description.clone(),
            display,
            cursor_offset,
            mode: self.mode(),
        }
    }

    /// Consume the session and produce its result.
    ///
    /// A session that is still active is cancelled first.
    pub fn finish(mut self) -> Outcome {
        self.cancel();
        match (self.phase, &mut self.state) {
            (Phase::Accepted, ModeState::Password { secret, .. }) => match secret.take() {
                Some(secret) => Outcome::Pin(secret),
                None => Outcome::Canceled,
            },
            (Phase::Accepted, ModeState::Confirm { confirmed }) => Outcome::Confirmed(*confirmed),
            (Phase::TimedOut, _) => Outcome::TimedOut,
            _ => Outcome::Canceled,
        }
    }

    /// Read-only access to the password buffer, for assertions.
    #[cfg(test)]
    pub(crate) fn buffer(&self) -> Option<&SecureBuffer> {
        match &self.state {
            ModeState::Password { buffer, .. } => Some(buffer),
            ModeState::Confirm { .. } => None,
        }
    }
}

// Manual Debug implementation to avoid exposing the secret
impl fmt::Debug for InputSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSession")
            .field("mode", &self.mode())
            .field("phase", &self.phase)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}
