//! Terminal input as [`SessionEvent`]s.
//!
//! | Terminal input              | Event                                  |
//! |-----------------------------|----------------------------------------|
//! | Enter                       | `KeyConfirm`                           |
//! | Esc, Ctrl+C                 | `KeyEscape`                            |
//! | Left / Right                | `KeyMoveLeft` / `KeyMoveRight`         |
//! | Backspace, Ctrl+H           | `KeyBackspace`                         |
//! | Delete                      | `KeyDelete`                            |
//! | Ctrl+V, Shift+Insert        | `KeyPaste`                             |
//! | `y`/`Y`, `n`/`N` (confirm)  | `KeyYes` / `KeyNo`                     |
//! | other printable keys        | `KeyChar`                              |
//! | other Ctrl+letter           | `KeyChar` with the control character   |
//! | bracketed paste             | `Paste`                                |
//! | focus lost                  | `FocusLost`                            |
//! | focus gained, resize        | `Redraw`                               |

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use pinentry_bar_core::{EventSource, PasteResult, PromptMode, SessionEvent};
use tracing::{trace, warn};

/// Translate one terminal event.
///
/// Returns `None` for input the prompt does not react to (mouse, key
/// releases, Alt combinations, ...).
pub fn translate(event: Event, mode: PromptMode) -> Option<SessionEvent> {
    match event {
        Event::Key(key) => translate_key(key, mode),
        Event::Paste(text) => Some(SessionEvent::Paste(PasteResult::from(text))),
        Event::FocusLost => Some(SessionEvent::FocusLost),
        Event::FocusGained | Event::Resize(_, _) => Some(SessionEvent::Redraw),
        Event::Mouse(_) => None,
    }
}

fn translate_key(key: KeyEvent, mode: PromptMode) -> Option<SessionEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    if key.modifiers.contains(KeyModifiers::ALT) {
        return None;
    }

    let event = match key.code {
        KeyCode::Enter => SessionEvent::KeyConfirm,
        KeyCode::Esc => SessionEvent::KeyEscape,
        KeyCode::Left => SessionEvent::KeyMoveLeft,
        KeyCode::Right => SessionEvent::KeyMoveRight,
        KeyCode::Backspace => SessionEvent::KeyBackspace,
        KeyCode::Delete => SessionEvent::KeyDelete,
        KeyCode::Insert if shift => SessionEvent::KeyPaste,
        KeyCode::Char(c) if ctrl => match c.to_ascii_lowercase() {
            'c' => SessionEvent::KeyEscape,
            'v' => SessionEvent::KeyPaste,
            'h' => SessionEvent::KeyBackspace,
            c if c.is_ascii_lowercase() => {
                SessionEvent::KeyChar(char::from(c as u8 & 0x1f).to_string())
            }
            _ => return None,
        },
        KeyCode::Char('y' | 'Y') if mode == PromptMode::Confirm => SessionEvent::KeyYes,
        KeyCode::Char('n' | 'N') if mode == PromptMode::Confirm => SessionEvent::KeyNo,
        KeyCode::Char(c) => SessionEvent::KeyChar(c.to_string()),
        KeyCode::Tab => SessionEvent::KeyChar("\t".to_string()),
        _ => return None,
    };
    Some(event)
}

/// [`EventSource`] reading the terminal through crossterm.
pub struct TerminalEvents {
    stream: EventStream,
    mode: PromptMode,
}

impl TerminalEvents {
    /// Start reading terminal input for a `mode` prompt.
    ///
    /// Opens crossterm's input reader right away, so the terminal device is
    /// already open by the time exclusive use of it is requested.
    pub fn new(mode: PromptMode) -> io::Result<Self> {
        crossterm::event::poll(Duration::ZERO)?;
        Ok(Self {
            stream: EventStream::new(),
            mode,
        })
    }
}

impl EventSource for TerminalEvents {
    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = Option<SessionEvent>> + '_>> {
        Box::pin(async move {
            loop {
                match self.stream.next().await {
                    None => return None,
                    Some(Ok(event)) => {
                        if let Some(event) = translate(event, self.mode) {
                            return Some(event);
                        }
                        trace!("Ignoring terminal event");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Failed to read terminal input");
                        return None;
                    }
                }
            }
        })
    }
}
