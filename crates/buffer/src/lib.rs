//! Gap-buffer text storage.
//!
//! The document is held as two growable byte regions meeting at the cursor:
//! `before` stores bytes below the cursor offset in order, `after` stores the
//! remaining bytes reversed so that both sides of the cursor are a `push` /
//! `pop` away. All cursor-local edits are O(1); moving the cursor by `n`
//! bytes costs O(n).
//!
//! Invariants:
//! * `cursor() == before.len()` and `cursor() + after.len() == size()`.
//! * `last_line()` equals the number of `\n` bytes in the buffer and
//!   `curs_line()` the number of `\n` bytes below the cursor; both are
//!   maintained by every mutation and cursor shift.
//! * Reads beyond either end of the buffer return `b'\n'`. This is a
//!   documented contract, not an accident: boundary-aware loops in callers
//!   (BOL/EOL scans, word movement) rely on it.

pub mod column;
pub mod lines;
pub mod words;

pub use lines::LineCache;

/// Byte returned for any read outside the buffer.
pub const SENTINEL: u8 = b'\n';

/// Two-region byte buffer split at the cursor.
#[derive(Debug, Clone, Default)]
pub struct EditBuffer {
    /// Bytes at offsets `0..cursor()`, in order.
    before: Vec<u8>,
    /// Bytes at offsets `cursor()..size()`, stored reversed.
    after: Vec<u8>,
    /// Count of `\n` bytes below the cursor.
    curs_line: usize,
    /// Count of `\n` bytes in the whole buffer.
    newlines: usize,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size both regions for a known document length (file load path).
    pub fn with_capacity(size_hint: usize) -> Self {
        Self {
            before: Vec::new(),
            after: Vec::with_capacity(size_hint),
            curs_line: 0,
            newlines: 0,
        }
    }

    /// Build a buffer with the cursor at offset 0.
    pub fn from_bytes(content: &[u8]) -> Self {
        let mut buf = Self::with_capacity(content.len());
        buf.after.extend(content.iter().rev());
        buf.newlines = content.iter().filter(|&&b| b == b'\n').count();
        buf
    }

    pub fn from_str(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    pub fn size(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Cursor byte offset.
    pub fn cursor(&self) -> usize {
        self.before.len()
    }

    /// Byte count of the after-cursor region.
    pub fn after_len(&self) -> usize {
        self.after.len()
    }

    /// Line number the cursor is on (0-based).
    pub fn curs_line(&self) -> usize {
        self.curs_line
    }

    /// 0-based number of the last line (== newline count).
    pub fn last_line(&self) -> usize {
        self.newlines
    }

    /// Total line count: newline count plus the trailing partial line.
    pub fn line_count(&self) -> usize {
        self.newlines + 1
    }

    // ---- primitive mutations ------------------------------------------------

    /// Insert one byte immediately before the cursor; the cursor advances
    /// past it.
    pub fn insert(&mut self, b: u8) {
        if b == b'\n' {
            self.newlines += 1;
            self.curs_line += 1;
        }
        self.before.push(b);
    }

    /// Insert one byte immediately after the cursor without moving it.
    pub fn insert_ahead(&mut self, b: u8) {
        if b == b'\n' {
            self.newlines += 1;
        }
        self.after.push(b);
    }

    /// Remove and return the byte at the cursor. `None` at end of buffer.
    pub fn delete(&mut self) -> Option<u8> {
        let b = self.after.pop()?;
        if b == b'\n' {
            self.newlines -= 1;
        }
        Some(b)
    }

    /// Remove and return the byte before the cursor; the cursor moves back.
    /// `None` at start of buffer.
    pub fn backspace(&mut self) -> Option<u8> {
        let b = self.before.pop()?;
        if b == b'\n' {
            self.newlines -= 1;
            self.curs_line -= 1;
        }
        Some(b)
    }

    /// Move the cursor one byte right, carrying the byte across the gap.
    /// Returns the byte crossed.
    pub fn shift_right(&mut self) -> Option<u8> {
        let b = self.after.pop()?;
        if b == b'\n' {
            self.curs_line += 1;
        }
        self.before.push(b);
        Some(b)
    }

    /// Move the cursor one byte left. Returns the byte crossed.
    pub fn shift_left(&mut self) -> Option<u8> {
        let b = self.before.pop()?;
        if b == b'\n' {
            self.curs_line -= 1;
        }
        self.after.push(b);
        Some(b)
    }

    /// Bulk append at the end of the buffer (stream load path). The cursor is
    /// expected to sit at the end; use [`EditBuffer::rewind`] afterwards.
    pub fn append(&mut self, chunk: &[u8]) {
        debug_assert!(self.after.is_empty());
        for &b in chunk {
            self.insert(b);
        }
    }

    /// Move the cursor back to offset 0 in a single pass.
    pub fn rewind(&mut self) {
        while let Some(b) = self.before.pop() {
            self.after.push(b);
        }
        self.curs_line = 0;
    }

    // ---- reads --------------------------------------------------------------

    /// Byte at an absolute offset; [`SENTINEL`] outside the buffer.
    pub fn get_byte(&self, offset: usize) -> u8 {
        if offset < self.before.len() {
            self.before[offset]
        } else if offset < self.size() {
            self.after[self.after.len() - 1 - (offset - self.before.len())]
        } else {
            SENTINEL
        }
    }

    /// Byte at the cursor.
    pub fn get_current_byte(&self) -> u8 {
        self.get_byte(self.cursor())
    }

    /// Byte immediately before the cursor; [`SENTINEL`] at offset 0.
    pub fn get_previous_byte(&self) -> u8 {
        match self.before.last() {
            Some(&b) => b,
            None => SENTINEL,
        }
    }

    /// Decode one UTF-8 character starting at `offset`. Returns the character
    /// and its byte length. A malformed sequence (or a lone continuation
    /// byte) decodes as that single byte with length 1 so that editing stays
    /// possible on arbitrary content.
    pub fn get_utf(&self, offset: usize) -> (char, usize) {
        let first = self.get_byte(offset);
        if first < 0x80 {
            return (first as char, 1);
        }
        let want = utf8_len(first);
        if want >= 2 && offset + want <= self.size() {
            let mut raw = [0u8; 4];
            for (i, slot) in raw.iter_mut().enumerate().take(want) {
                *slot = self.get_byte(offset + i);
            }
            if let Ok(s) = std::str::from_utf8(&raw[..want])
                && let Some(c) = s.chars().next()
            {
                return (c, want);
            }
        }
        (first as char, 1)
    }

    /// Decode the UTF-8 character ending immediately before `offset`.
    pub fn get_prev_utf(&self, offset: usize) -> (char, usize) {
        if offset == 0 || offset > self.size() {
            return (SENTINEL as char, 0);
        }
        // Walk back over continuation bytes to a candidate lead byte, then
        // accept the decode only if its length lands exactly on `offset`.
        for back in 1..=4usize.min(offset) {
            let b = self.get_byte(offset - back);
            if b < 0x80 || b >= 0xC0 {
                let (c, len) = self.get_utf(offset - back);
                if len == back {
                    return (c, len);
                }
                break;
            }
        }
        (self.get_byte(offset - 1) as char, 1)
    }

    // ---- line-boundary scans -------------------------------------------------

    /// Offset of the first byte of the line containing `offset`.
    pub fn get_bol(&self, offset: usize) -> usize {
        let mut p = offset.min(self.size());
        while p > 0 && self.get_byte(p - 1) != b'\n' {
            p -= 1;
        }
        p
    }

    /// Offset of the `\n` ending the line containing `offset` (or the buffer
    /// end for the final line).
    pub fn get_eol(&self, offset: usize) -> usize {
        let mut p = offset.min(self.size());
        while p < self.size() && self.get_byte(p) != b'\n' {
            p += 1;
        }
        p
    }

    pub fn get_current_bol(&self) -> usize {
        self.get_bol(self.cursor())
    }

    pub fn get_current_eol(&self) -> usize {
        self.get_eol(self.cursor())
    }

    /// Offset of the beginning of the line `lines` whole lines after `from`.
    /// Clamps at the final line.
    pub fn forward_offset(&self, from: usize, lines: usize) -> usize {
        let mut cur = from;
        for _ in 0..lines {
            let next = self.get_eol(cur) + 1;
            if next > self.size() {
                break;
            }
            cur = next;
        }
        cur
    }

    /// Offset of the beginning of the line `lines` whole lines before `from`.
    /// Clamps at offset 0.
    pub fn backward_offset(&self, from: usize, lines: usize) -> usize {
        let mut cur = self.get_bol(from);
        for _ in 0..lines {
            if cur == 0 {
                break;
            }
            cur = self.get_bol(cur - 1);
        }
        cur
    }

    /// Count `\n` bytes in `[from, to)`.
    pub fn count_lines(&self, from: usize, to: usize) -> usize {
        let to = to.min(self.size());
        (from..to).filter(|&p| self.get_byte(p) == b'\n').count()
    }

    /// Copy of the byte range `[from, to)`, clamped to the buffer.
    pub fn slice(&self, from: usize, to: usize) -> Vec<u8> {
        let to = to.min(self.size());
        (from..to).map(|p| self.get_byte(p)).collect()
    }

    /// The whole content as one owned vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        out.extend_from_slice(&self.before);
        out.extend(self.after.iter().rev());
        out
    }
}

/// Expected sequence length for a UTF-8 lead byte (1 for ASCII and for
/// invalid leads, letting the caller fall back to a single byte).
fn utf8_len(lead: u8) -> usize {
    match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(text: &str) -> EditBuffer {
        let mut buf = EditBuffer::new();
        for b in text.bytes() {
            buf.insert(b);
        }
        buf
    }

    #[test]
    fn insert_and_read_back() {
        let buf = filled("hello");
        assert_eq!(buf.size(), 5);
        assert_eq!(buf.cursor(), 5);
        assert_eq!(buf.to_bytes(), b"hello");
    }

    #[test]
    fn sentinel_beyond_both_ends() {
        let buf = filled("ab");
        assert_eq!(buf.get_byte(2), SENTINEL);
        assert_eq!(buf.get_byte(100), SENTINEL);
        let empty = EditBuffer::new();
        assert_eq!(empty.get_previous_byte(), SENTINEL);
        assert_eq!(empty.get_current_byte(), SENTINEL);
    }

    #[test]
    fn delete_and_backspace_return_bytes() {
        let mut buf = filled("abc");
        buf.shift_left();
        assert_eq!(buf.delete(), Some(b'c'));
        assert_eq!(buf.backspace(), Some(b'b'));
        assert_eq!(buf.to_bytes(), b"a");
        assert_eq!(buf.cursor(), 1);
    }

    #[test]
    fn line_counters_track_newlines() {
        let mut buf = filled("a\nb\n");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.curs_line(), 2);
        buf.backspace(); // removes trailing \n
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.curs_line(), 1);
        buf.insert_ahead(b'\n');
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.curs_line(), 1);
    }

    #[test]
    fn shift_crosses_gap_and_updates_curs_line() {
        let mut buf = filled("x\ny");
        buf.rewind();
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.curs_line(), 0);
        buf.shift_right();
        buf.shift_right();
        assert_eq!(buf.curs_line(), 1);
        buf.shift_left();
        assert_eq!(buf.curs_line(), 0);
        assert_eq!(buf.to_bytes(), b"x\ny");
    }

    #[test]
    fn bol_eol_scans() {
        let buf = filled("one\ntwo\nthree");
        assert_eq!(buf.get_bol(0), 0);
        assert_eq!(buf.get_bol(5), 4);
        assert_eq!(buf.get_eol(5), 7);
        assert_eq!(buf.get_eol(9), 13); // final line ends at buffer end
        assert_eq!(buf.get_current_bol(), 8);
    }

    #[test]
    fn forward_backward_offsets() {
        let buf = filled("one\ntwo\nthree\n");
        assert_eq!(buf.forward_offset(0, 1), 4);
        assert_eq!(buf.forward_offset(0, 2), 8);
        assert_eq!(buf.forward_offset(0, 99), 14); // clamped at final bol
        assert_eq!(buf.backward_offset(8, 1), 4);
        assert_eq!(buf.backward_offset(8, 99), 0);
        // forward_offset tolerates a mid-line starting point
        assert_eq!(buf.forward_offset(5, 1), 8);
    }

    #[test]
    fn count_lines_half_open() {
        let buf = filled("a\nb\nc");
        assert_eq!(buf.count_lines(0, buf.size()), 2);
        assert_eq!(buf.count_lines(0, 2), 1);
        assert_eq!(buf.count_lines(2, 2), 0);
        assert_eq!(buf.count_lines(0, 1000), 2);
    }

    #[test]
    fn utf8_decode_and_fallback() {
        let buf = filled("a\u{00e9}\u{4e16}!");
        assert_eq!(buf.get_utf(0), ('a', 1));
        assert_eq!(buf.get_utf(1), ('\u{00e9}', 2));
        assert_eq!(buf.get_utf(3), ('\u{4e16}', 3));
        assert_eq!(buf.get_prev_utf(3), ('\u{00e9}', 2));
        assert_eq!(buf.get_prev_utf(6), ('\u{4e16}', 3));
        // lone continuation byte decodes as itself with length 1
        let mut bad = EditBuffer::new();
        bad.insert(0x80);
        bad.insert(b'x');
        assert_eq!(bad.get_utf(0), ('\u{80}', 1));
        assert_eq!(bad.get_prev_utf(1), ('\u{80}', 1));
        // truncated lead byte at end of buffer
        let mut trunc = EditBuffer::new();
        trunc.insert(0xE4);
        assert_eq!(trunc.get_utf(0), ('\u{e4}', 1));
    }

    #[test]
    fn from_bytes_places_cursor_at_start() {
        let buf = EditBuffer::from_str("l1\nl2\n");
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.curs_line(), 0);
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.get_current_byte(), b'l');
    }

    #[test]
    fn randomized_edits_match_vec_model() {
        use rand::{Rng, SeedableRng, rngs::StdRng};

        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut buf = EditBuffer::new();
        let mut model: Vec<u8> = Vec::new();
        let mut cursor = 0usize;

        for _ in 0..4000 {
            match rng.gen_range(0..5) {
                0 => {
                    let b = if rng.gen_bool(0.2) {
                        b'\n'
                    } else {
                        rng.gen_range(b'a'..=b'z')
                    };
                    buf.insert(b);
                    model.insert(cursor, b);
                    cursor += 1;
                }
                1 => {
                    let b = rng.gen_range(b'a'..=b'z');
                    buf.insert_ahead(b);
                    model.insert(cursor, b);
                }
                2 => {
                    assert_eq!(buf.delete().is_some(), cursor < model.len());
                    if cursor < model.len() {
                        model.remove(cursor);
                    }
                }
                3 => {
                    assert_eq!(buf.backspace().is_some(), cursor > 0);
                    if cursor > 0 {
                        cursor -= 1;
                        model.remove(cursor);
                    }
                }
                _ => {
                    if rng.gen_bool(0.5) {
                        if buf.shift_right().is_some() {
                            cursor += 1;
                        }
                    } else if buf.shift_left().is_some() {
                        cursor -= 1;
                    }
                }
            }
            assert_eq!(buf.size(), model.len());
            assert_eq!(buf.cursor(), cursor);
        }
        assert_eq!(buf.to_bytes(), model);
        let expected_newlines = model.iter().filter(|&&b| b == b'\n').count();
        assert_eq!(buf.last_line(), expected_newlines);
        let below = model[..cursor].iter().filter(|&&b| b == b'\n').count();
        assert_eq!(buf.curs_line(), below);
        for (i, &b) in model.iter().enumerate() {
            assert_eq!(buf.get_byte(i), b);
        }
    }
}
