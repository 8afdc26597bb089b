//! The controlling terminal device.
//!
//! - [`TtyDevice`]: the opened tty (default `/dev/tty`)
//! - [`TtyGrab`]: exclusive input capture via `TIOCEXCL`
//! - [`TerminalGeometry`]: the terminal as the only "monitor"
//! - [`TerminalSelection`]: selection requests (pastes arrive on their own)
//!
//! Key input and raw mode always go through the terminal on stdin (or
//! `/dev/tty` when stdin is not one), so an explicitly named device must be
//! that same terminal.

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal};
use std::os::fd::AsFd;
use std::os::unix::fs::MetadataExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use pinentry_bar_core::{
    GeometryError, GeometryQuery, InputGrabber, MonitorRect, SelectionError, SelectionSource,
};
use tracing::{debug, trace, warn};

/// Device used when no path is given.
pub const DEFAULT_TTY: &str = "/dev/tty";

/// An open terminal device.
#[derive(Debug)]
pub struct TtyDevice {
    file: File,
}

impl TtyDevice {
    /// Open `path` (or [`DEFAULT_TTY`]) for reading and writing.
    ///
    /// A `path` given explicitly must be the terminal on stdin, which is
    /// where keys are read from.
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        let explicit = path.is_some_and(|p| p != Path::new(DEFAULT_TTY));
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_TTY));
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        // SAFETY: isatty only inspects the descriptor we own.
        if unsafe { libc::isatty(file.as_raw_fd()) } != 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a terminal", path.display()),
            ));
        }

        if explicit {
            check_input_terminal(path, file.metadata()?.rdev(), stdin_terminal()?)?;
        }

        debug!(path = %path.display(), "Opened terminal");
        Ok(Self { file })
    }

    /// A second handle on the same open file description.
    pub fn try_clone(&self) -> io::Result<File> {
        self.file.try_clone()
    }

    /// Grabber bound to this device.
    pub fn grabber(&self) -> io::Result<TtyGrab> {
        Ok(TtyGrab::new(self.try_clone()?))
    }

    /// Geometry of this device.
    pub fn geometry(&self) -> io::Result<TerminalGeometry> {
        Ok(TerminalGeometry::new(self.try_clone()?))
    }
}

/// Device number of the terminal on stdin, if stdin is one.
fn stdin_terminal() -> io::Result<Option<u64>> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Ok(None);
    }
    let fd = stdin.as_fd().try_clone_to_owned()?;
    Ok(Some(File::from(fd).metadata()?.rdev()))
}

/// Refuse a device other than the one keys are read from.
fn check_input_terminal(path: &Path, device: u64, input: Option<u64>) -> io::Result<()> {
    match input {
        Some(input) if input == device => Ok(()),
        Some(_) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not the terminal on standard input", path.display()),
        )),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} cannot be used: standard input is not a terminal",
                path.display()
            ),
        )),
    }
}

impl AsRawFd for TtyDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Exclusive use of the terminal.
///
/// `TIOCEXCL` makes further `open(2)` calls on the tty fail for everybody
/// but root, so no new reader can attach while the secret is typed.
/// Descriptors opened earlier are unaffected.
#[derive(Debug)]
pub struct TtyGrab {
    file: File,
    held: bool,
}

impl TtyGrab {
    pub fn new(file: File) -> Self {
        Self { file, held: false }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }
}

impl InputGrabber for TtyGrab {
    fn try_grab(&mut self) -> bool {
        // SAFETY: TIOCEXCL takes no argument and only touches tty state.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), libc::TIOCEXCL) };
        if rc == 0 {
            self.held = true;
        } else {
            trace!(error = %io::Error::last_os_error(), "TIOCEXCL failed");
        }
        self.held
    }

    fn release(&mut self) {
        if !self.held {
            return;
        }
        // SAFETY: as above.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), libc::TIOCNXCL) };
        if rc != 0 {
            warn!(error = %io::Error::last_os_error(), "Failed to release terminal");
        }
        self.held = false;
    }
}

impl Drop for TtyGrab {
    fn drop(&mut self) {
        self.release();
    }
}

/// Terminal geometry.
///
/// A terminal has no monitor list; the bar is placed inside the terminal
/// window, whose size in cells is the embedding rectangle.
#[derive(Debug)]
pub struct TerminalGeometry {
    file: File,
}

impl TerminalGeometry {
    /// Geometry of the terminal open on `file`.
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl GeometryQuery for TerminalGeometry {
    fn monitors(&self) -> Result<Vec<MonitorRect>, GeometryError> {
        Ok(Vec::new())
    }

    fn embedding_rect(&self) -> Result<MonitorRect, GeometryError> {
        let mut size = libc::winsize {
            ws_row: 0,
            ws_col: 0,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        // SAFETY: TIOCGWINSZ only writes a winsize into `size`.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), libc::TIOCGWINSZ, &mut size) };
        if rc != 0 {
            return Err(GeometryError::EmbeddingWindow(
                io::Error::last_os_error().to_string(),
            ));
        }

        let (cols, rows) = (size.ws_col, size.ws_row);
        if cols == 0 || rows == 0 {
            return Err(GeometryError::EmbeddingWindow(format!(
                "terminal reports {}x{} cells",
                cols, rows
            )));
        }
        Ok(MonitorRect::new(0, 0, u32::from(cols), u32::from(rows)))
    }
}

/// Selection requests on a terminal.
///
/// The terminal emulator owns the clipboard and delivers pastes through
/// bracketed paste, so an explicit request has nothing to send. It is
/// recorded for the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSelection;

impl TerminalSelection {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionSource for TerminalSelection {
    fn request_selection(&mut self, max_bytes: usize) -> Result<(), SelectionError> {
        debug!(
            max_bytes,
            "Paste requested; waiting for the terminal to send it"
        );
        Ok(())
    }
}
