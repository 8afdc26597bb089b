//! Rune-aware, capacity-bounded secret buffer.
//!
//! [`SecureBuffer`] holds the text typed into a password prompt. It is the
//! only place the secret exists while the session is active.
//!
//! # Security Properties
//!
//! - **Bounded**: content never exceeds `capacity - 1` bytes. An insertion
//!   that does not fit is dropped as a whole, never truncated.
//! - **Rune boundaries**: the cursor only ever rests on a UTF-8 rune
//!   boundary; moves and deletions step over whole runes.
//! - **Zeroization**: bytes vacated by a deletion are wiped immediately, the
//!   whole storage is wiped on discard, after handing the secret out, and on
//!   drop.
//! - **Swap Protection**: the storage is `mlock`ed when the process is
//!   allowed to.
//!
//! # Example
//!
//! ```
//! use pinentry_bar_core::buffer::SecureBuffer;
//! use secrecy::ExposeSecret;
//!
//! let mut buffer = SecureBuffer::with_capacity(64);
//! buffer.insert("héllo");
//! buffer.move_left();
//! buffer.delete_before();
//! assert_eq!(buffer.rune_count(), 4);
//!
//! let secret = buffer.take_secret();
//! assert_eq!(secret.expose_secret(), "hélo");
//! assert!(buffer.is_empty());
//! ```

use std::fmt;

use secrecy::SecretString;
use tracing::{debug, trace};
use zeroize::Zeroize;

/// Default capacity in bytes, the historical `BUFSIZ`.
pub const DEFAULT_CAPACITY: usize = 8192;

/// Largest capacity a buffer is created with (1 MiB).
pub const MAX_CAPACITY: usize = 1 << 20;

/// Value every storage byte holds after a wipe.
pub const FILL_BYTE: u8 = 0;

/// Direction of a one-rune cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Whether `byte` is a UTF-8 continuation byte (`10xxxxxx`).
fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// A fixed-capacity byte buffer for secrets with a rune-aligned cursor.
pub struct SecureBuffer {
    /// Backing storage; only `storage[..len]` is meaningful.
    storage: Box<[u8]>,
    /// Number of content bytes.
    len: usize,
    /// Byte offset of the cursor, always on a rune boundary.
    cursor: usize,
    /// Whether `storage` is memory-locked.
    memory_locked: bool,
}

impl SecureBuffer {
    /// Create an empty buffer with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer holding at most `capacity - 1` content bytes.
    ///
    /// A capacity below 1 is raised to 1 (a buffer that accepts nothing);
    /// one above [`MAX_CAPACITY`] is lowered to it.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buffer = Self {
            storage: vec![FILL_BYTE; capacity.clamp(1, MAX_CAPACITY)].into_boxed_slice(),
            len: 0,
            cursor: 0,
            memory_locked: false,
        };
        buffer.try_lock_memory();
        buffer
    }

    fn try_lock_memory(&mut self) {
        let ptr = self.storage.as_mut_ptr();
        let size = self.storage.len();

        // Safety: the region is owned by `self.storage` and unlocked in `Drop`
        // before the allocation is released.
        let result = unsafe { memsec::mlock(ptr, size) };

        if result {
            self.memory_locked = true;
        } else {
            // Common for unprivileged processes (RLIMIT_MEMLOCK).
            debug!(size, "Failed to lock secret buffer memory");
        }
    }

    /// Total storage size in bytes.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of content bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of the cursor.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of runes in the buffer.
    pub fn rune_count(&self) -> usize {
        self.runes_before(self.len)
    }

    /// Number of runes before the cursor.
    pub fn cursor_rune_index(&self) -> usize {
        self.runes_before(self.cursor)
    }

    fn runes_before(&self, offset: usize) -> usize {
        self.storage[..offset]
            .iter()
            .filter(|byte| !is_continuation(**byte))
            .count()
    }

    /// Offset of the neighbouring rune boundary in `direction`, clamped to
    /// `0..=len`.
    fn neighbour_boundary(&self, direction: Direction) -> usize {
        match direction {
            Direction::Left => {
                let mut offset = self.cursor.saturating_sub(1);
                while offset > 0 && is_continuation(self.storage[offset]) {
                    offset -= 1;
                }
                offset
            }
            Direction::Right => {
                let mut offset = (self.cursor + 1).min(self.len);
                while offset < self.len && is_continuation(self.storage[offset]) {
                    offset += 1;
                }
                offset
            }
        }
    }

    /// Insert `text` at the cursor and move the cursor past it.
    ///
    /// Returns `false` (and leaves the buffer untouched) when the text does
    /// not fit into the remaining capacity.
    pub fn insert(&mut self, text: &str) -> bool {
        let bytes = text.as_bytes();
        let n = bytes.len();
        if n == 0 {
            return true;
        }
        if self.len + n > self.capacity() - 1 {
            trace!(len = self.len, incoming = n, "Insertion exceeds capacity, dropped");
            return false;
        }

        self.storage.copy_within(self.cursor..self.len, self.cursor + n);
        self.storage[self.cursor..self.cursor + n].copy_from_slice(bytes);
        self.len += n;
        self.cursor += n;
        true
    }

    /// Move the cursor one rune in `direction`. No-op at the boundary.
    pub fn move_cursor(&mut self, direction: Direction) -> bool {
        let at_boundary = match direction {
            Direction::Left => self.cursor == 0,
            Direction::Right => self.cursor == self.len,
        };
        if at_boundary {
            return false;
        }
        self.cursor = self.neighbour_boundary(direction);
        true
    }

    pub fn move_left(&mut self) -> bool {
        self.move_cursor(Direction::Left)
    }

    pub fn move_right(&mut self) -> bool {
        self.move_cursor(Direction::Right)
    }

    /// Remove the rune before the cursor (Backspace). No-op at offset 0.
    pub fn delete_before(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let start = self.neighbour_boundary(Direction::Left);
        self.remove_range(start, self.cursor);
        true
    }

    /// Remove the rune at the cursor (Delete). No-op at the end of content.
    pub fn delete_at(&mut self) -> bool {
        if self.cursor == self.len {
            return false;
        }
        let end = self.neighbour_boundary(Direction::Right);
        self.remove_range(self.cursor, end);
        true
    }

    /// Remove `storage[start..end]`, close the gap, wipe the vacated tail and
    /// leave the cursor at `start`.
    fn remove_range(&mut self, start: usize, end: usize) {
        let removed = end - start;
        self.storage.copy_within(end..self.len, start);
        let new_len = self.len - removed;
        self.storage[new_len..self.len].zeroize();
        self.len = new_len;
        self.cursor = start;
    }

    /// Hand the content out as a secret and wipe the buffer.
    pub fn take_secret(&mut self) -> SecretString {
        // Content only ever grows by whole `&str` insertions and shrinks by
        // whole runes, so it is always valid UTF-8.
        let text = std::str::from_utf8(&self.storage[..self.len]).unwrap_or_default();
        let secret = SecretString::from(text.to_string());
        self.wipe();
        secret
    }

    /// Overwrite the entire storage with [`FILL_BYTE`] and reset to empty.
    pub fn discard(&mut self) {
        self.wipe();
        debug!("Secret buffer discarded");
    }

    fn wipe(&mut self) {
        self.storage[..].zeroize();
        self.len = 0;
        self.cursor = 0;
    }

    /// Raw backing storage, for verifying wipes.
    #[cfg(test)]
    pub(crate) fn storage(&self) -> &[u8] {
        &self.storage
    }

    /// Current content, for assertions.
    #[cfg(test)]
    pub(crate) fn content(&self) -> &str {
        std::str::from_utf8(&self.storage[..self.len]).unwrap()
    }
}

impl Default for SecureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.storage[..].zeroize();

        if self.memory_locked {
            let ptr = self.storage.as_mut_ptr();
            let size = self.storage.len();
            // Safety: unlocking the region locked in `try_lock_memory`.
            unsafe {
                memsec::munlock(ptr, size);
            }
        }
    }
}

// Manual Debug implementation to avoid exposing the secret
impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBuffer")
            .field("content", &"[REDACTED]")
            .field("len", &self.len)
            .field("cursor", &self.cursor)
            .field("capacity", &self.capacity())
            .field("memory_locked", &self.memory_locked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn is_rune_boundary(buffer: &SecureBuffer) -> bool {
        let cursor = buffer.cursor();
        cursor == 0 || cursor == buffer.len() || !is_continuation(buffer.storage()[cursor])
    }

    #[test]
    fn capacity_is_clamped() {
        assert_eq!(SecureBuffer::with_capacity(0).capacity(), 1);
        assert_eq!(SecureBuffer::with_capacity(usize::MAX).capacity(), MAX_CAPACITY);
    }

    #[test]
    fn insert_advances_cursor() {
        let mut buffer = SecureBuffer::with_capacity(16);
        assert!(buffer.insert("ab"));
        assert!(buffer.insert("c"));
        assert_eq!(buffer.content(), "abc");
        assert_eq!(buffer.cursor(), 3);
    }

    #[test]
    fn insert_in_the_middle() {
        let mut buffer = SecureBuffer::with_capacity(16);
        buffer.insert("ac");
        buffer.move_left();
        buffer.insert("b");
        assert_eq!(buffer.content(), "abc");
        assert_eq!(buffer.cursor(), 2);
    }

    #[test]
    fn insert_beyond_capacity_is_dropped_whole() {
        // Capacity 8 holds at most 7 content bytes.
        let mut buffer = SecureBuffer::with_capacity(8);
        assert!(buffer.insert("abcde"));
        assert!(!buffer.insert("€")); // 3 bytes: 5 + 3 > 7
        assert_eq!(buffer.content(), "abcde");
        assert!(buffer.insert("é")); // 2 bytes: 5 + 2 == 7
        assert_eq!(buffer.len(), 7);
        assert!(!buffer.insert("x"));
        assert_eq!(buffer.len(), 7);
    }

    #[test]
    fn backspace_removes_whole_three_byte_rune() {
        let mut buffer = SecureBuffer::with_capacity(16);
        buffer.insert("a");
        buffer.insert("€");
        assert_eq!(buffer.len(), 4);

        assert!(buffer.delete_before());
        assert_eq!(buffer.content(), "a");
        assert_eq!(buffer.cursor(), 1);
    }

    #[test]
    fn backspace_after_two_byte_rune_in_hello() {
        let mut buffer = SecureBuffer::with_capacity(32);
        buffer.insert("héllo");
        // Walk back to just after "é" (byte offset 3).
        buffer.move_left();
        buffer.move_left();
        buffer.move_left();
        assert_eq!(buffer.cursor(), 3);

        assert!(buffer.delete_before());
        assert_eq!(buffer.content(), "hllo");
        assert_eq!(buffer.cursor(), 1);
    }

    #[test]
    fn delete_at_removes_rune_under_cursor() {
        let mut buffer = SecureBuffer::with_capacity(32);
        buffer.insert("a€b");
        buffer.move_left();
        buffer.move_left();
        assert_eq!(buffer.cursor(), 1);

        assert!(buffer.delete_at());
        assert_eq!(buffer.content(), "ab");
        assert_eq!(buffer.cursor(), 1);
    }

    #[test]
    fn deletes_at_boundaries_are_noops() {
        let mut buffer = SecureBuffer::with_capacity(16);
        assert!(!buffer.delete_before());
        assert!(!buffer.delete_at());

        buffer.insert("xy");
        assert!(!buffer.delete_at()); // cursor at end
        buffer.move_left();
        buffer.move_left();
        assert!(!buffer.delete_before()); // cursor at start
        assert_eq!(buffer.content(), "xy");
    }

    #[test]
    fn moves_skip_continuation_bytes() {
        let mut buffer = SecureBuffer::with_capacity(32);
        buffer.insert("a😀b"); // 😀 is 4 bytes
        assert!(buffer.move_left());
        assert_eq!(buffer.cursor(), 5);
        assert!(buffer.move_left());
        assert_eq!(buffer.cursor(), 1);
        assert!(buffer.move_right());
        assert_eq!(buffer.cursor(), 5);
    }

    #[test]
    fn left_then_right_returns_to_interior_offset() {
        let mut buffer = SecureBuffer::with_capacity(32);
        buffer.insert("aé€😀z");
        let mut offsets = Vec::new();
        while buffer.move_left() {
            offsets.push(buffer.cursor());
        }
        for offset in offsets.into_iter().filter(|o| *o > 0) {
            // Reposition at `offset` from the start.
            while buffer.move_left() {}
            while buffer.cursor() < offset {
                buffer.move_right();
            }
            assert_eq!(buffer.cursor(), offset);
            buffer.move_left();
            buffer.move_right();
            assert_eq!(buffer.cursor(), offset);
        }
    }

    #[test]
    fn moves_at_boundaries_are_idempotent() {
        let mut buffer = SecureBuffer::with_capacity(16);
        buffer.insert("ab");
        assert!(!buffer.move_right());
        assert!(!buffer.move_right());
        assert_eq!(buffer.cursor(), 2);

        while buffer.move_left() {}
        assert!(!buffer.move_left());
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn rune_counts_ignore_continuation_bytes() {
        let mut buffer = SecureBuffer::with_capacity(32);
        buffer.insert("hé€😀");
        assert_eq!(buffer.len(), 1 + 2 + 3 + 4);
        assert_eq!(buffer.rune_count(), 4);
        buffer.move_left();
        assert_eq!(buffer.cursor_rune_index(), 3);
    }

    #[test]
    fn random_edit_sequence_keeps_invariants() {
        // Small deterministic LCG so the sequence is reproducible.
        let mut state: u32 = 0x2545_f491;
        let mut next = || {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            state >> 16
        };
        let runes = ["a", "é", "€", "😀", "zz"];
        let mut buffer = SecureBuffer::with_capacity(24);

        for _ in 0..2000 {
            match next() % 5 {
                0 => {
                    buffer.insert(runes[(next() as usize) % runes.len()]);
                }
                1 => {
                    buffer.delete_before();
                }
                2 => {
                    buffer.delete_at();
                }
                3 => {
                    buffer.move_left();
                }
                _ => {
                    buffer.move_right();
                }
            }
            assert!(buffer.len() <= buffer.capacity() - 1);
            assert!(buffer.cursor() <= buffer.len());
            assert!(is_rune_boundary(&buffer));
            assert!(std::str::from_utf8(&buffer.storage()[..buffer.len()]).is_ok());
            // Everything past the content has been wiped.
            assert!(buffer.storage()[buffer.len()..].iter().all(|b| *b == FILL_BYTE));
        }
    }

    #[test]
    fn discard_fills_storage_with_fixed_pattern() {
        let mut buffer = SecureBuffer::with_capacity(16);
        buffer.insert("hunter2");
        buffer.discard();

        assert!(buffer.is_empty());
        assert_eq!(buffer.cursor(), 0);
        assert!(buffer.storage().iter().all(|b| *b == FILL_BYTE));
    }

    #[test]
    fn take_secret_transfers_content_and_wipes() {
        let mut buffer = SecureBuffer::with_capacity(16);
        buffer.insert("pïn");

        let secret = buffer.take_secret();
        assert_eq!(secret.expose_secret(), "pïn");
        assert!(buffer.is_empty());
        assert!(buffer.storage().iter().all(|b| *b == FILL_BYTE));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut buffer = SecureBuffer::with_capacity(0);
        assert_eq!(buffer.capacity(), 1);
        assert!(!buffer.insert("a"));
    }

    #[test]
    fn debug_is_redacted() {
        let mut buffer = SecureBuffer::with_capacity(16);
        buffer.insert("top-secret");
        let debug_output = format!("{:?}", buffer);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("top-secret"));
    }
}
