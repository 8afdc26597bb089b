//! Drawing the bar on a terminal.
//!
//! The bar is one row of the alternate screen: the primary prompt in reverse
//! video, the description, then the masked input (or `(y/n)`). Widths are
//! terminal columns as reported by `unicode-width`.
//!
//! Text reaches the terminal only through [`layout`], which replaces control
//! characters so caller-supplied prompts cannot carry escape sequences.

use std::fs::File;
use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableFocusChange, EnableBracketedPaste, EnableFocusChange,
};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use pinentry_bar_core::{BarGeometry, DrawSurface, RenderRequest, SurfaceError, TextMeasure};
use tracing::{debug, trace, warn};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// One laid-out bar row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarLine {
    /// Prompt cell, drawn in reverse video (empty when there is no prompt).
    pub prompt: String,
    /// Description, drawn normally.
    pub description: String,
    /// Masked input or the confirmation affordance.
    pub content: String,
    /// Column of the text cursor, if it is shown and fits.
    pub cursor_col: Option<u16>,
}

/// Shown in place of a control character.
const REPLACEMENT: char = '\u{fffd}';

/// Lay `request` out on a row `width` columns wide.
pub fn layout(request: &RenderRequest, width: u32) -> BarLine {
    let mut remaining = width;

    let prompt = if request.prompt.is_empty() {
        String::new()
    } else {
        clip(&format!(" {} ", sanitize(&request.prompt)), &mut remaining)
    };
    let description = if request.description.is_empty() {
        String::new()
    } else {
        clip(&format!(" {}", sanitize(&request.description)), &mut remaining)
    };

    // One column for the separating space.
    let start = width - remaining + 1;
    let content = clip(&format!(" {}", sanitize(&request.display)), &mut remaining);

    let cursor_col = request
        .cursor_offset
        .and_then(|offset| start.checked_add(offset))
        .filter(|col| *col < width)
        .and_then(|col| u16::try_from(col).ok());

    BarLine {
        prompt,
        description,
        content,
        cursor_col,
    }
}

/// Replace control characters, which the terminal would interpret.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { REPLACEMENT } else { c })
        .collect()
}

/// Take the longest prefix of `text` that fits in `remaining` columns.
fn clip(text: &str, remaining: &mut u32) -> String {
    let mut used = 0;
    let mut end = 0;
    for (index, c) in text.char_indices() {
        let w = c.width().unwrap_or(0) as u32;
        if used + w > *remaining {
            break;
        }
        used += w;
        end = index + c.len_utf8();
    }
    *remaining -= used;
    text[..end].to_string()
}

/// A [`DrawSurface`] on a terminal device.
///
/// The terminal is switched to raw mode and the alternate screen when the
/// bar is mapped and restored on close (or drop).
pub struct TerminalSurface {
    out: File,
    geometry: Option<BarGeometry>,
    active: bool,
}

impl TerminalSurface {
    /// Draw on `out` (a handle on the tty).
    pub fn new(out: File) -> Self {
        Self {
            out,
            geometry: None,
            active: false,
        }
    }

    fn enter(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        self.active = true;
        execute!(
            self.out,
            EnterAlternateScreen,
            EnableBracketedPaste,
            EnableFocusChange,
            Hide
        )
    }

    fn leave(&mut self) -> io::Result<()> {
        self.active = false;
        let restored = execute!(
            self.out,
            Show,
            DisableFocusChange,
            DisableBracketedPaste,
            LeaveAlternateScreen
        );
        disable_raw_mode()?;
        restored
    }

    fn draw(&mut self, line: &BarLine, row: u16) -> io::Result<()> {
        queue!(self.out, Hide, MoveTo(0, row), Clear(ClearType::CurrentLine))?;
        if !line.prompt.is_empty() {
            queue!(
                self.out,
                SetAttribute(Attribute::Reverse),
                Print(&line.prompt),
                SetAttribute(Attribute::Reset)
            )?;
        }
        queue!(self.out, Print(&line.description), Print(&line.content))?;
        if let Some(col) = line.cursor_col {
            queue!(self.out, MoveTo(col, row), Show)?;
        }
        self.out.flush()
    }
}

impl TextMeasure for TerminalSurface {
    fn text_width(&self, text: &str) -> u32 {
        sanitize(text).width() as u32
    }
}

impl DrawSurface for TerminalSurface {
    fn bar_height(&self) -> u32 {
        1
    }

    fn map(&mut self, geometry: &BarGeometry) -> Result<(), SurfaceError> {
        if !self.active {
            self.enter().map_err(|e| {
                SurfaceError::InitializationFailed(format!("cannot set up terminal: {}", e))
            })?;
        }
        self.geometry = Some(*geometry);
        execute!(self.out, Clear(ClearType::All)).map_err(SurfaceError::Draw)?;
        debug!(row = geometry.y, width = geometry.width, "Bar mapped");
        Ok(())
    }

    fn render(&mut self, request: &RenderRequest) -> Result<(), SurfaceError> {
        let Some(geometry) = self.geometry else {
            return Err(SurfaceError::InitializationFailed(
                "render before map".to_string(),
            ));
        };
        let line = layout(request, geometry.width);
        let row = u16::try_from(geometry.y.max(0)).unwrap_or(u16::MAX);
        self.draw(&line, row).map_err(SurfaceError::Draw)
    }

    fn raise(&mut self) -> Result<(), SurfaceError> {
        execute!(self.out, Clear(ClearType::All)).map_err(SurfaceError::Draw)
    }

    fn reassert_focus(&mut self) -> Result<(), SurfaceError> {
        // The terminal emulator decides focus; there is nothing to take back.
        trace!("Focus re-assertion requested");
        Ok(())
    }

    fn close(&mut self) {
        if self.active {
            if let Err(e) = self.leave() {
                warn!(error = %e, "Failed to restore terminal");
            }
        }
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinentry_bar_core::PromptMode;

    fn request(prompt: &str, description: &str, display: &str, cursor: Option<u32>) -> RenderRequest {
        RenderRequest {
            prompt: prompt.to_string(),
            description: description.to_string(),
            display: display.to_string(),
            cursor_offset: cursor,
            mode: PromptMode::Password,
        }
    }

    #[test]
    fn layout_places_cursor_after_prompt_and_description() {
        let line = layout(&request("PIN:", "key", "***", Some(3)), 80);

        assert_eq!(line.prompt, " PIN: ");
        assert_eq!(line.description, " key");
        assert_eq!(line.content, " ***");
        // 6 + 4 columns, one space, three markers.
        assert_eq!(line.cursor_col, Some(14));
    }

    #[test]
    fn layout_without_prompt() {
        let line = layout(&request("", "", "**", Some(0)), 80);
        assert_eq!(line.prompt, "");
        assert_eq!(line.description, "");
        assert_eq!(line.cursor_col, Some(1));
    }

    #[test]
    fn layout_clips_to_width() {
        let line = layout(&request("PIN:", "a long description", "*****", Some(5)), 12);

        let total = line.prompt.width() + line.description.width() + line.content.width();
        assert!(total <= 12);
        assert_eq!(line.prompt, " PIN: ");
        assert_eq!(line.description, " a lon");
        assert_eq!(line.content, "");
        assert_eq!(line.cursor_col, None);
    }

    #[test]
    fn control_character_markers_do_not_skew_the_cursor() {
        let line = layout(&request("", "", "\u{7}\u{7}\u{7}", Some(0)), 80);
        assert_eq!(line.content, " \u{fffd}\u{fffd}\u{fffd}");
        assert_eq!(line.cursor_col, Some(1));

        let line = layout(&request("PIN:", "", "\u{7}", Some(1)), 80);
        assert_eq!(line.cursor_col, Some(8));
    }

    #[test]
    fn escape_sequences_in_prompts_are_neutralised() {
        let line = layout(
            &request("\u{1b}]0;x\u{7}PIN:", "host\u{1b}[2J\u{1b}[1;1Hfake", "**", Some(2)),
            80,
        );

        for segment in [&line.prompt, &line.description, &line.content] {
            assert!(!segment.chars().any(char::is_control), "{:?}", segment);
        }
        assert_eq!(line.description, " host\u{fffd}[2J\u{fffd}[1;1Hfake");
    }

    #[test]
    fn clip_never_splits_wide_chars() {
        let mut remaining = 3;
        assert_eq!(clip("日本語", &mut remaining), "日");
        assert_eq!(remaining, 1);
    }

    #[test]
    fn confirm_layout_has_no_cursor() {
        let mut req = request("", "Allow?", "(y/n)", None);
        req.mode = PromptMode::Confirm;
        let line = layout(&req, 80);
        assert_eq!(line.content, " (y/n)");
        assert_eq!(line.cursor_col, None);
    }

    #[test]
    fn measures_columns() {
        let surface = TerminalSurface::new(File::open("/dev/null").unwrap());
        assert_eq!(surface.text_width("***"), 3);
        assert_eq!(surface.text_width("日本"), 4);
        assert_eq!(surface.text_width("\u{7}"), 1);
        assert_eq!(surface.bar_height(), 1);
    }
}
