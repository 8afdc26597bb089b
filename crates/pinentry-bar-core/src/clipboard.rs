//! Clipboard paste into the secret buffer.
//!
//! A paste is a two-step exchange: the session asks the selection owner for
//! text (bounded to [`ClipboardBridge::max_transfer`] bytes), and the payload
//! later comes back as a [`PasteResult`]. Only the first line of the payload
//! is inserted, under the same all-or-nothing capacity rule as typed input.

use std::fmt;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::buffer::SecureBuffer;
use crate::traits::{SelectionError, SelectionSource};

/// Selection payload delivered by the selection system.
///
/// The bytes are not assumed to be NUL-terminated or valid UTF-8. They are
/// wiped when the result is dropped.
#[derive(Clone)]
pub struct PasteResult {
    bytes: Zeroizing<Vec<u8>>,
}

impl PasteResult {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }

    /// The text up to (excluding) the first newline, limited to `max_bytes`
    /// and cut at the first byte sequence that is not valid UTF-8.
    pub fn first_line(&self, max_bytes: usize) -> &str {
        let bounded = &self.bytes[..self.bytes.len().min(max_bytes)];
        let line = match bounded.iter().position(|b| *b == b'\n') {
            Some(end) => &bounded[..end],
            None => bounded,
        };
        match std::str::from_utf8(line) {
            Ok(text) => text,
            Err(e) => {
                // `valid_up_to` marks a prefix that always decodes.
                std::str::from_utf8(&line[..e.valid_up_to()]).unwrap_or_default()
            }
        }
    }
}

impl From<Vec<u8>> for PasteResult {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<String> for PasteResult {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

// Manual Debug implementation to avoid exposing pasted secrets
impl fmt::Debug for PasteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasteResult")
            .field("bytes", &"[REDACTED]")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Moves selection data into a [`SecureBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipboardBridge {
    max_transfer: usize,
}

impl ClipboardBridge {
    /// Bridge for a buffer of `capacity` bytes.
    ///
    /// The transfer bound is the capacity rounded up to whole 32-bit units
    /// plus one unit, so a full buffer's worth of text always fits.
    pub fn for_capacity(capacity: usize) -> Self {
        Self {
            max_transfer: (capacity / 4).saturating_add(1).saturating_mul(4),
        }
    }

    /// Largest payload requested from the selection owner.
    pub fn max_transfer(&self) -> usize {
        self.max_transfer
    }

    /// Fire a selection request.
    pub fn request<S: SelectionSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<(), SelectionError> {
        debug!(max_bytes = self.max_transfer, "Requesting selection");
        source.request_selection(self.max_transfer)
    }

    /// Insert the first line of `paste` at the cursor and release the payload.
    ///
    /// Returns `false` when the line does not fit (the buffer is unchanged).
    pub fn insert(&self, buffer: &mut SecureBuffer, paste: PasteResult) -> bool {
        if paste.len() > self.max_transfer {
            warn!(
                len = paste.len(),
                max_bytes = self.max_transfer,
                "Selection payload exceeds requested size, truncating"
            );
        }
        let inserted = buffer.insert(paste.first_line(self.max_transfer));
        debug!(inserted, "Selection pasted");
        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSelection;
    use secrecy::ExposeSecret;

    #[test]
    fn paste_stops_at_first_newline() {
        let bridge = ClipboardBridge::for_capacity(64);
        let mut buffer = SecureBuffer::with_capacity(64);

        assert!(bridge.insert(&mut buffer, PasteResult::from("secret\npadding".to_string())));
        assert_eq!(buffer.take_secret().expose_secret(), "secret");
    }

    #[test]
    fn paste_without_newline_inserts_everything() {
        let bridge = ClipboardBridge::for_capacity(64);
        let mut buffer = SecureBuffer::with_capacity(64);
        buffer.insert("ab");
        buffer.move_left();

        bridge.insert(&mut buffer, PasteResult::from("XY".to_string()));
        assert_eq!(buffer.cursor(), 3);
        assert_eq!(buffer.take_secret().expose_secret(), "aXYb");
    }

    #[test]
    fn paste_larger_than_remaining_capacity_is_dropped() {
        let bridge = ClipboardBridge::for_capacity(8);
        let mut buffer = SecureBuffer::with_capacity(8);
        buffer.insert("abcd");

        assert!(!bridge.insert(&mut buffer, PasteResult::from("efgh".to_string())));
        assert_eq!(buffer.take_secret().expose_secret(), "abcd");
    }

    #[test]
    fn invalid_utf8_is_cut_at_first_bad_sequence() {
        let paste = PasteResult::new(vec![b'o', b'k', 0xFF, b'x']);
        assert_eq!(paste.first_line(64), "ok");
    }

    #[test]
    fn oversized_payload_is_truncated_to_transfer_bound() {
        let bridge = ClipboardBridge::for_capacity(8);
        assert_eq!(bridge.max_transfer(), 12);

        let paste = PasteResult::from("0123456789abcdef".to_string());
        assert_eq!(paste.first_line(bridge.max_transfer()), "0123456789ab");
    }

    #[test]
    fn transfer_bound_saturates() {
        assert_eq!(ClipboardBridge::for_capacity(usize::MAX).max_transfer(), usize::MAX);
    }

    #[test]
    fn request_passes_transfer_bound() {
        let bridge = ClipboardBridge::for_capacity(8192);
        let mut source = MockSelection::new();

        bridge.request(&mut source).unwrap();
        assert_eq!(source.requests(), &[8196]);
    }

    #[test]
    fn debug_is_redacted() {
        let paste = PasteResult::from("hunter2".to_string());
        let debug_output = format!("{:?}", paste);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }
}
