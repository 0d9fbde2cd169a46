//! Document state: one gap buffer plus everything layered on it — undo/redo
//! recording and replay, selection marks, the sticky-column cursor engine and
//! the modification/line-change hooks.
//!
//! The only sanctioned way to change content or the cursor is through the
//! primitives on [`Document`] (`insert`, `insert_ahead`, `delete_*`,
//! `backspace_*`, `cursor_move`). Each primitive records its reverse action
//! on the undo log, shifts the selection marks, invalidates the line cache
//! and fires the hooks, so every higher-level operation composed from them
//! stays undoable and observable for free.
//!
//! Undo routing: while an undo group is being replayed, the primitives'
//! inverse pushes land on the redo stack instead of the undo stack. Redo
//! replays run with normal routing, so the redone actions re-record
//! themselves on the undo side. A `redo_invalidated` flag armed by every
//! non-undo/redo command clears the redo stack at the next recorded action.

use edit_buffer::{EditBuffer, LineCache, column, words};
use edit_config::EditOptions;
use std::fmt;
use tracing::trace;

pub mod io;
pub mod undo;

pub use edit_config::LineBreak;
pub use io::{LoadError, SaveError};
pub use undo::{REPEAT_LIMIT, UndoEntry, UndoLog};

/// Callbacks a document fires into its collaborators.
///
/// `modified` fires once per transition from unmodified to modified (a file
/// lock manager wants exactly one notification). The line hooks fire for
/// every newline inserted or removed, carrying the affected line number, so
/// per-line annotation stores (bookmarks, syntax caches) can shift their
/// indices.
pub trait DocumentHooks {
    fn modified(&mut self) {}
    fn line_inserted(&mut self, _line: usize) {}
    fn line_removed(&mut self, _line: usize) {}
}

pub struct Document {
    pub(crate) buffer: EditBuffer,
    pub(crate) cache: LineCache,
    pub(crate) undo: UndoLog,
    pub(crate) redo: UndoLog,
    pub(crate) options: EditOptions,

    // selection marks; `mark2 == None` means the selection end follows the
    // cursor, `mark1 == mark2` means no selection
    pub(crate) mark1: usize,
    pub(crate) mark2: Option<usize>,
    pub(crate) end_mark_curs: Option<usize>,
    pub(crate) column1: usize,
    pub(crate) column2: usize,
    pub(crate) column_highlight: bool,

    // sticky column: the intended column across vertical moves, plus the
    // virtual columns past end-of-line when cursor_beyond_eol is on
    pub(crate) prev_col: usize,
    pub(crate) over_col: usize,

    // display scroll anchor; recorded into key-press group markers so undo
    // restores the scroll position of the keystroke it reverts
    pub(crate) start_display: usize,
    pub(crate) start_line: usize,

    pub(crate) overwrite: bool,
    pub(crate) modified: bool,
    pub(crate) recording: bool,
    pub(crate) replaying_undo: bool,
    pub(crate) redo_invalidated: bool,

    pub(crate) hooks: Option<Box<dyn DocumentHooks>>,
}

// hooks are not representable, keep the Debug surface small
impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("size", &self.buffer.size())
            .field("cursor", &self.buffer.cursor())
            .field("line_count", &self.buffer.line_count())
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

impl Document {
    pub fn new(options: EditOptions) -> Self {
        let max_undo = options.max_undo_entries;
        Self {
            buffer: EditBuffer::new(),
            cache: LineCache::new(),
            undo: UndoLog::new(max_undo),
            redo: UndoLog::new(max_undo),
            options,
            mark1: 0,
            mark2: Some(0),
            end_mark_curs: None,
            column1: 0,
            column2: 0,
            column_highlight: false,
            prev_col: 0,
            over_col: 0,
            start_display: 0,
            start_line: 0,
            overwrite: false,
            modified: false,
            recording: true,
            replaying_undo: false,
            redo_invalidated: false,
            hooks: None,
        }
    }

    pub fn from_str(options: EditOptions, text: &str) -> Self {
        let mut doc = Self::new(options);
        doc.buffer = EditBuffer::from_str(text);
        doc
    }

    // ---- accessors ----------------------------------------------------------

    pub fn options(&self) -> &EditOptions {
        &self.options
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    pub fn size(&self) -> usize {
        self.buffer.size()
    }

    pub fn curs_line(&self) -> usize {
        self.buffer.curs_line()
    }

    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Reset the modified flag after a successful save; the next mutation
    /// fires the modification hook again.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub fn set_hooks(&mut self, hooks: Box<dyn DocumentHooks>) {
        self.hooks = Some(hooks);
    }

    pub fn take_hooks(&mut self) -> Option<Box<dyn DocumentHooks>> {
        self.hooks.take()
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn set_overwrite(&mut self, on: bool) {
        self.overwrite = on;
    }

    pub fn column_highlight(&self) -> bool {
        self.column_highlight
    }

    pub fn set_column_highlight(&mut self, on: bool) {
        self.column_highlight = on;
    }

    pub fn over_col(&self) -> usize {
        self.over_col
    }

    pub fn set_over_col(&mut self, v: usize) {
        self.over_col = v;
    }

    pub fn prev_col(&self) -> usize {
        self.prev_col
    }

    pub fn set_prev_col(&mut self, v: usize) {
        self.prev_col = v;
    }

    /// Remember the current visual column as the sticky column.
    pub fn update_prev_col(&mut self) {
        self.prev_col = self.curs_col();
    }

    pub fn mark1(&self) -> usize {
        self.mark1
    }

    pub fn mark2(&self) -> Option<usize> {
        self.mark2
    }

    pub fn mark_columns(&self) -> (usize, usize) {
        (self.column1, self.column2)
    }

    /// True when the marks delimit something (including a selection still
    /// following the cursor).
    pub fn has_selection(&self) -> bool {
        match self.mark2 {
            None => true,
            Some(m2) => m2 != self.mark1,
        }
    }

    /// Whole content as bytes (test and save support).
    pub fn bytes(&self) -> Vec<u8> {
        self.buffer.to_bytes()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }

    // ---- undo recording -----------------------------------------------------

    fn push_action(&mut self, entry: UndoEntry) {
        if !self.recording {
            return;
        }
        if self.replaying_undo {
            self.redo.push(entry);
            return;
        }
        if self.redo_invalidated {
            self.redo.clear();
        }
        self.undo.push(entry);
    }

    /// Record an entry directly (the dispatcher uses this for column-mode
    /// toggles around selection changes).
    pub fn record_action(&mut self, entry: UndoEntry) {
        self.push_action(entry);
    }

    /// Record the start of a key-press group: the current scroll anchor, plus
    /// the live mark state when a selection is still following the cursor.
    pub fn push_key_press(&mut self) {
        self.push_action(UndoEntry::KeyPress(self.start_display));
        if self.mark2.is_none() {
            self.push_action(UndoEntry::Mark1(self.mark1));
            self.push_action(UndoEntry::MarkCursor(self.end_mark_curs));
        }
    }

    /// Save the full mark state onto the undo log.
    pub fn push_markers(&mut self) {
        self.push_action(UndoEntry::Mark1(self.mark1));
        self.push_action(UndoEntry::Mark2(self.mark2));
        self.push_action(UndoEntry::MarkCursor(self.end_mark_curs));
    }

    pub fn set_redo_invalidated(&mut self, v: bool) {
        self.redo_invalidated = v;
    }

    // ---- modification bookkeeping -------------------------------------------

    fn modification(&mut self) {
        self.cache.invalidate();
        if !self.modified {
            self.modified = true;
            if let Some(h) = self.hooks.as_mut() {
                h.modified();
            }
        }
    }

    fn notify_line_inserted(&mut self, line: usize) {
        if let Some(h) = self.hooks.as_mut() {
            h.line_inserted(line);
        }
    }

    fn notify_line_removed(&mut self, line: usize) {
        if let Some(h) = self.hooks.as_mut() {
            h.line_removed(line);
        }
    }

    // ---- primitives ---------------------------------------------------------

    /// Insert one byte before the cursor.
    pub fn insert(&mut self, c: u8) {
        if self.buffer.cursor() < self.start_display {
            self.start_display += 1;
            if c == b'\n' {
                self.start_line += 1;
            }
        }
        self.modification();
        if c == b'\n' {
            self.notify_line_inserted(self.buffer.curs_line());
        }
        self.push_action(UndoEntry::Backspace);
        if self.mark1 > self.buffer.cursor() {
            self.mark1 += 1;
        }
        if let Some(m2) = self.mark2
            && m2 > self.buffer.cursor()
        {
            self.mark2 = Some(m2 + 1);
        }
        self.buffer.insert(c);
    }

    /// Insert one byte after the cursor without moving it.
    pub fn insert_ahead(&mut self, c: u8) {
        if self.buffer.cursor() < self.start_display {
            self.start_display += 1;
            if c == b'\n' {
                self.start_line += 1;
            }
        }
        self.modification();
        if c == b'\n' {
            self.notify_line_inserted(self.buffer.curs_line());
        }
        self.push_action(UndoEntry::Delete);
        if self.mark1 >= self.buffer.cursor() {
            self.mark1 += 1;
        }
        if let Some(m2) = self.mark2
            && m2 >= self.buffer.cursor()
        {
            self.mark2 = Some(m2 + 1);
        }
        self.buffer.insert_ahead(c);
    }

    fn delete_impl(&mut self, char_len: usize) -> Option<u8> {
        if self.buffer.after_len() == 0 {
            return None;
        }
        if self.has_selection() {
            self.push_markers();
        }
        let mut last = 0u8;
        for _ in 0..char_len {
            let curs = self.buffer.cursor();
            if self.mark1 > curs {
                self.mark1 -= 1;
                if let Some(e) = self.end_mark_curs {
                    self.end_mark_curs = Some(e.saturating_sub(1));
                }
            }
            if let Some(m2) = self.mark2
                && m2 > curs
            {
                self.mark2 = Some(m2 - 1);
            }
            let Some(p) = self.buffer.delete() else { break };
            last = p;
            self.push_action(UndoEntry::InsertAheadByte(p));
        }
        self.modification();
        if last == b'\n' {
            self.notify_line_removed(self.buffer.curs_line());
        }
        if self.buffer.cursor() < self.start_display {
            self.start_display -= 1;
            if last == b'\n' {
                self.start_line -= 1;
            }
        }
        Some(last)
    }

    /// Remove the byte at the cursor. Returns the removed byte.
    pub fn delete_byte(&mut self) -> Option<u8> {
        self.delete_impl(1)
    }

    /// Remove the whole character at the cursor (one byte in non-UTF-8
    /// documents). Returns its last byte.
    pub fn delete_char(&mut self) -> Option<u8> {
        let len = if self.options.utf8 {
            self.buffer.get_utf(self.buffer.cursor()).1.max(1)
        } else {
            1
        };
        self.delete_impl(len)
    }

    fn backspace_impl(&mut self, char_len: usize) -> Option<u8> {
        if self.buffer.cursor() == 0 {
            return None;
        }
        if self.has_selection() {
            self.push_markers();
        }
        let line_before = self.buffer.curs_line();
        let mut last = 0u8;
        for _ in 0..char_len {
            let curs = self.buffer.cursor();
            if self.mark1 >= curs {
                self.mark1 -= 1;
                if let Some(e) = self.end_mark_curs {
                    self.end_mark_curs = Some(e.saturating_sub(1));
                }
            }
            if let Some(m2) = self.mark2
                && m2 >= curs
            {
                self.mark2 = Some(m2 - 1);
            }
            let Some(p) = self.buffer.backspace() else {
                break;
            };
            last = p;
            self.push_action(UndoEntry::InsertByte(p));
        }
        self.modification();
        if last == b'\n' {
            self.notify_line_removed(line_before);
        }
        if self.buffer.cursor() < self.start_display {
            self.start_display -= 1;
            if last == b'\n' {
                self.start_line -= 1;
            }
        }
        Some(last)
    }

    /// Remove the byte before the cursor; the cursor moves back.
    pub fn backspace_byte(&mut self) -> Option<u8> {
        self.backspace_impl(1)
    }

    /// Remove the whole character before the cursor.
    pub fn backspace_char(&mut self) -> Option<u8> {
        let len = if self.options.utf8 {
            self.buffer.get_prev_utf(self.buffer.cursor()).1.max(1)
        } else {
            1
        };
        self.backspace_impl(len)
    }

    /// Move the cursor by `increment` bytes (negative = left), clamped at
    /// the buffer edges.
    pub fn cursor_move(&mut self, increment: isize) {
        if increment < 0 {
            for _ in 0..increment.unsigned_abs() {
                if self.buffer.cursor() == 0 {
                    break;
                }
                self.push_action(UndoEntry::CursorRight);
                self.buffer.shift_left();
            }
        } else {
            for _ in 0..increment as usize {
                if self.buffer.after_len() == 0 {
                    break;
                }
                self.push_action(UndoEntry::CursorLeft);
                self.buffer.shift_right();
            }
        }
    }

    /// Materialize a pending beyond-EOL virtual column as real spaces.
    pub fn insert_over(&mut self) {
        for _ in 0..self.over_col {
            self.insert(b' ');
        }
        self.over_col = 0;
    }

    /// Copy the previous line's leading whitespace (the line is
    /// newline-terminated, so no range check is needed).
    pub fn auto_indent(&mut self) {
        let mut p = self.buffer.backward_offset(self.buffer.cursor(), 1);
        loop {
            let c = self.buffer.get_byte(p);
            if c != b' ' && c != b'\t' {
                break;
            }
            self.insert(c);
            p += 1;
        }
    }

    // ---- cursor engine ------------------------------------------------------

    /// Visual column of the cursor on its line.
    pub fn curs_col(&self) -> usize {
        let b = self.buffer.get_current_bol();
        column::column_at(&self.buffer, b, self.buffer.cursor(), self.options.tab_width)
    }

    /// Move one character right; past the last character of a line this
    /// grows the virtual column instead when `cursor_beyond_eol` is on.
    pub fn right_char_move(&mut self) {
        let (c, len) = if self.options.utf8 {
            let (c, l) = self.buffer.get_utf(self.buffer.cursor());
            (c, l.max(1))
        } else {
            (self.buffer.get_current_byte() as char, 1)
        };
        if self.options.cursor_beyond_eol && c == '\n' {
            self.over_col += 1;
        } else {
            self.cursor_move(len as isize);
        }
    }

    /// Move one character left, consuming any virtual column first.
    pub fn left_char_move(&mut self) {
        if self.column_highlight
            && self.options.cursor_beyond_eol
            && self.has_selection()
            && self.over_col == 0
            && self.buffer.cursor() == self.buffer.get_current_bol()
        {
            return;
        }
        let len = if self.options.utf8 {
            self.buffer.get_prev_utf(self.buffer.cursor()).1.max(1)
        } else {
            1
        };
        if self.options.cursor_beyond_eol && self.over_col > 0 {
            self.over_col -= 1;
        } else {
            self.cursor_move(-(len as isize));
        }
    }

    /// Re-establish the sticky column after landing at the beginning of a
    /// line at `p`: walk to `prev_col` (+ any virtual columns), then either
    /// carry the surplus as a virtual column (beyond-EOL mode) or settle on
    /// the line as-is.
    pub fn move_to_prev_col(&mut self, p: usize) {
        let prev = self.prev_col;
        let over = self.over_col;
        let tab = self.options.tab_width;

        let target = column::offset_at_column(&self.buffer, p, prev + over, tab);
        self.cursor_move(target as isize - self.buffer.cursor() as isize);

        if self.options.cursor_beyond_eol {
            let b = self.buffer.get_current_bol();
            let e = self.buffer.get_current_eol();
            let line_len = column::column_at(&self.buffer, b, e, tab);
            if line_len < prev + over {
                self.over_col = prev + over - line_len;
                self.prev_col = line_len;
            } else {
                self.prev_col = prev + over;
                self.over_col = 0;
            }
        } else {
            self.over_col = 0;
        }
    }

    fn move_updown(&mut self, lines: usize, do_scroll: bool, up: bool) {
        let available = if up {
            self.buffer.curs_line()
        } else {
            self.buffer.last_line() - self.buffer.curs_line()
        };
        let lines = lines.min(available);
        if lines == 0 {
            return;
        }
        if do_scroll {
            if up {
                self.scroll_upward(lines);
            } else {
                self.scroll_downward(lines);
            }
        }
        let p = self.buffer.get_current_bol();
        let p = if up {
            self.buffer.backward_offset(p, lines)
        } else {
            self.buffer.forward_offset(p, lines)
        };
        self.cursor_move(p as isize - self.buffer.cursor() as isize);
        self.move_to_prev_col(p);

        // the column walk can land inside a multi-byte character; a
        // right-then-left character move recenters on its first byte
        if self.options.utf8
            && self.buffer.cursor() > 0
            && self.buffer.cursor() + 1 < self.buffer.size()
            && (0x80..0xC0).contains(&self.buffer.get_current_byte())
        {
            self.right_char_move();
            self.left_char_move();
        }
    }

    /// Move up `lines` whole lines, clamped at the first line; the sticky
    /// column decides where the cursor lands.
    pub fn move_up(&mut self, lines: usize, do_scroll: bool) {
        self.move_updown(lines, do_scroll, true);
    }

    /// Move down `lines` whole lines, clamped at the last line.
    pub fn move_down(&mut self, lines: usize, do_scroll: bool) {
        self.move_updown(lines, do_scroll, false);
    }

    pub fn cursor_to_bol(&mut self) {
        let b = self.buffer.get_current_bol();
        self.cursor_move(b as isize - self.buffer.cursor() as isize);
        self.update_prev_col();
        self.over_col = 0;
    }

    pub fn cursor_to_eol(&mut self) {
        let e = self.buffer.get_current_eol();
        self.cursor_move(e as isize - self.buffer.cursor() as isize);
        self.update_prev_col();
        self.over_col = 0;
    }

    pub fn move_to_top(&mut self) {
        if self.buffer.curs_line() != 0 {
            self.cursor_move(-(self.buffer.cursor() as isize));
            self.move_to_prev_col(0);
        }
    }

    pub fn move_to_bottom(&mut self) {
        if self.buffer.curs_line() < self.buffer.last_line() {
            let n = self.buffer.last_line() - self.buffer.curs_line();
            self.move_down(n, false);
        }
    }

    /// Put the cursor on `line` (clamped to the document).
    pub fn move_to_line(&mut self, line: usize) {
        let line = line.min(self.buffer.last_line());
        if line < self.buffer.curs_line() {
            self.move_up(self.buffer.curs_line() - line, false);
        } else {
            self.move_down(line - self.buffer.curs_line(), false);
        }
    }

    /// Byte offset of the first byte of `line`, answered through the line
    /// cache.
    pub fn find_line_offset(&mut self, line: usize) -> usize {
        self.cache.offset_for_line(&self.buffer, line)
    }

    pub fn line_is_blank(&mut self, line: usize) -> bool {
        let offset = self.find_line_offset(line);
        let s = self.buffer.get_bol(offset);
        let f = self.buffer.get_eol(offset);
        (s..f).all(|p| self.buffer.get_byte(p).is_ascii_whitespace())
    }

    /// Up to the nearest blank line, or just before the previous paragraph.
    pub fn move_up_paragraph(&mut self, do_scroll: bool) {
        let curs_line = self.buffer.curs_line();
        let mut i = 0usize;
        if curs_line > 1 {
            if !self.line_is_blank(curs_line) {
                i = curs_line - 1;
                while i != 0 {
                    if self.line_is_blank(i) {
                        break;
                    }
                    i -= 1;
                }
            } else if self.line_is_blank(curs_line - 1) {
                i = curs_line - 1;
                while i != 0 {
                    if !self.line_is_blank(i) {
                        i += 1;
                        break;
                    }
                    i -= 1;
                }
            } else {
                i = curs_line - 1;
                while i != 0 {
                    if self.line_is_blank(i) {
                        break;
                    }
                    i -= 1;
                }
            }
        }
        self.move_up(curs_line - i, do_scroll);
    }

    /// Down to the nearest blank line, or just before the next paragraph.
    pub fn move_down_paragraph(&mut self, do_scroll: bool) {
        let curs_line = self.buffer.curs_line();
        let last = self.buffer.last_line();
        let i;
        if curs_line + 1 >= last {
            i = last;
        } else if !self.line_is_blank(curs_line) {
            let mut j = curs_line + 1;
            while j < last && !self.line_is_blank(j) {
                j += 1;
            }
            i = j;
        } else if self.line_is_blank(curs_line + 1) {
            let mut j = curs_line + 1;
            while j <= last && self.line_is_blank(j) {
                j += 1;
            }
            i = j - 1;
        } else {
            let mut j = curs_line + 1;
            while j < last && !self.line_is_blank(j) {
                j += 1;
            }
            i = j;
        }
        self.move_down(i - curs_line, do_scroll);
    }

    fn matching_bracket_offset(&self) -> Option<usize> {
        let c = self.buffer.get_current_byte();
        let d = match c {
            b'{' => b'}',
            b'}' => b'{',
            b'[' => b']',
            b']' => b'[',
            b'(' => b')',
            b')' => b'(',
            _ => return None,
        };
        let forward = matches!(c, b'{' | b'[' | b'(');
        let step: i64 = if forward { 1 } else { -1 };
        let mut depth: i64 = 1;
        let mut q = self.buffer.cursor() as i64 + step;
        while q >= 0 && (q as usize) < self.buffer.size() {
            let a = self.buffer.get_byte(q as usize);
            depth += (a == c) as i64 - (a == d) as i64;
            if depth == 0 {
                return Some(q as usize);
            }
            q += step;
        }
        None
    }

    /// Jump to the bracket matching the one under the cursor, if any.
    pub fn goto_matching_bracket(&mut self) {
        if let Some(q) = self.matching_bracket_offset() {
            self.cursor_move(q as isize - self.buffer.cursor() as isize);
        }
    }

    // ---- scroll anchor ------------------------------------------------------

    pub fn start_display(&self) -> usize {
        self.start_display
    }

    pub fn start_line(&self) -> usize {
        self.start_line
    }

    pub fn scroll_upward(&mut self, lines: usize) {
        let lines = lines.min(self.start_line);
        if lines != 0 {
            self.start_line -= lines;
            self.start_display = self.buffer.backward_offset(self.start_display, lines);
        }
    }

    pub fn scroll_downward(&mut self, lines: usize) {
        let below = self.buffer.last_line().saturating_sub(self.start_line);
        let lines = lines.min(below);
        if lines != 0 {
            self.start_line += lines;
            self.start_display = self.buffer.forward_offset(self.start_display, lines);
        }
    }

    // ---- selection marks ----------------------------------------------------

    pub fn set_markers(&mut self, m1: usize, m2: Option<usize>, c1: usize, c2: usize) {
        self.mark1 = m1;
        self.mark2 = m2;
        self.column1 = c1;
        self.column2 = c2;
    }

    /// Toggle-style mark command. `unmark` clears the selection; otherwise a
    /// fixed selection starts following the cursor again, and a following
    /// selection is fixed at the cursor.
    pub fn mark_cmd(&mut self, unmark: bool) {
        self.push_markers();
        if unmark {
            self.set_markers(0, Some(0), 0, 0);
        } else if self.mark2.is_some() {
            self.end_mark_curs = None;
            let col = self.curs_col() + self.over_col;
            self.set_markers(self.buffer.cursor(), None, col, col);
        } else {
            self.end_mark_curs = Some(self.buffer.cursor());
            let col = self.curs_col() + self.over_col;
            let m1 = self.mark1;
            let c1 = self.column1;
            self.set_markers(m1, Some(self.buffer.cursor()), c1, col);
        }
    }

    /// Select the word under the cursor.
    pub fn mark_word(&mut self) {
        let mut pos = self.buffer.cursor();
        while pos != 0 {
            let c1 = self.buffer.get_byte(pos);
            let c2 = self.buffer.get_byte(pos - 1);
            if !words::is_space(c1) && words::is_space(c2) {
                break;
            }
            if words::word_class(c1) & words::word_class(c2) == 0 {
                break;
            }
            pos -= 1;
        }
        self.mark1 = pos;
        while pos < self.buffer.size() {
            let c1 = self.buffer.get_byte(pos);
            let c2 = self.buffer.get_byte(pos + 1);
            if !words::is_space(c1) && words::is_space(c2) {
                break;
            }
            if words::word_class(c1) & words::word_class(c2) == 0 {
                break;
            }
            pos += 1;
        }
        self.mark2 = Some((pos + 1).min(self.buffer.size()));
    }

    /// Select the current line (without its newline).
    pub fn mark_line(&mut self) {
        self.mark1 = self.buffer.get_current_bol();
        self.mark2 = Some(self.buffer.get_current_eol());
    }

    /// Resolve the marks into an ordered half-open byte range, `None` when
    /// nothing is selected. In column mode with an inverted rectangle (the
    /// column interval runs against the byte order) the range is widened per
    /// the recorded columns, clamped to the first and last selected lines.
    pub fn eval_marks(&mut self) -> Option<(usize, usize)> {
        if self.mark2 == Some(self.mark1) {
            self.column1 = 0;
            self.column2 = 0;
            return None;
        }

        let end_mark_curs = match self.end_mark_curs {
            Some(e) => e,
            None => self.buffer.cursor(),
        };

        let (mut start, mut end);
        match self.mark2 {
            Some(m2) => {
                start = self.mark1.min(m2);
                end = self.mark1.max(m2);
            }
            None => {
                start = self.mark1.min(end_mark_curs);
                end = self.mark1.max(end_mark_curs);
                self.column2 = self.curs_col() + self.over_col;
            }
        }

        if self.column_highlight
            && ((self.mark1 > end_mark_curs && self.column1 < self.column2)
                || (self.mark1 < end_mark_curs && self.column1 > self.column2))
        {
            let tab = self.options.tab_width;
            let start_bol = self.buffer.get_bol(start);
            let end_bol = self.buffer.get_bol(end);
            let end_eol = self.buffer.get_eol(end);
            let col1 = self.column1.min(self.column2);
            let col2 = self.column1.max(self.column2);

            let diff1 = column::offset_at_column(&self.buffer, start_bol, col2, tab)
                - column::offset_at_column(&self.buffer, start_bol, col1, tab);
            let diff2 = column::offset_at_column(&self.buffer, end_bol, col2, tab)
                - column::offset_at_column(&self.buffer, end_bol, col1, tab);

            start = start.saturating_sub(diff1).max(start_bol);
            end = (end + diff2).min(end_eol);
        }

        Some((start, end))
    }

    // ---- undo / redo replay -------------------------------------------------

    fn apply_entry(&mut self, entry: UndoEntry) {
        match entry {
            UndoEntry::CursorRight => self.cursor_move(1),
            UndoEntry::CursorLeft => self.cursor_move(-1),
            UndoEntry::Backspace => {
                self.backspace_byte();
            }
            UndoEntry::Delete => {
                self.delete_byte();
            }
            UndoEntry::InsertByte(b) => self.insert(b),
            UndoEntry::InsertAheadByte(b) => self.insert_ahead(b),
            UndoEntry::ColumnModeOn => self.column_highlight = true,
            UndoEntry::ColumnModeOff => self.column_highlight = false,
            UndoEntry::Mark1(m) => {
                self.mark1 = m;
                let b = self.buffer.get_bol(m);
                self.column1 = column::column_at(&self.buffer, b, m, self.options.tab_width);
            }
            UndoEntry::Mark2(m) => {
                self.mark2 = m;
                if let Some(m) = m {
                    let b = self.buffer.get_bol(m);
                    self.column2 = column::column_at(&self.buffer, b, m, self.options.tab_width);
                }
            }
            UndoEntry::MarkCursor(v) => self.end_mark_curs = v,
            // group markers terminate the replay loop before reaching here;
            // run headers are expanded by pop()
            UndoEntry::KeyPress(_) | UndoEntry::Repeat(_) => {}
        }
    }

    fn restore_scroll(&mut self, scroll: usize) {
        if self.start_display > scroll {
            self.start_line -= self.buffer.count_lines(scroll, self.start_display);
        } else if self.start_display < scroll {
            self.start_line += self.buffer.count_lines(self.start_display, scroll);
        }
        self.start_display = scroll;
    }

    fn do_undo(&mut self) {
        self.over_col = 0;
        if self.undo.peek().is_none() {
            return;
        }
        self.replaying_undo = true;
        // group marker on the redo side carries the live scroll anchor
        self.redo.push(UndoEntry::KeyPress(self.start_display));
        let mut popped = 0usize;
        let scroll = loop {
            match self.undo.pop() {
                None => break None,
                Some(UndoEntry::KeyPress(s)) => break Some(s),
                Some(entry) => {
                    self.apply_entry(entry);
                    popped += 1;
                }
            }
        };
        if let Some(s) = scroll {
            self.restore_scroll(s);
        }
        self.replaying_undo = false;
        trace!(target: "document.undo", popped, hit_bottom = scroll.is_none(), "undo_group_replayed");
    }

    /// Undo one key-press group; with the `group_undo` option, keep undoing
    /// while consecutive groups carry the same leading action.
    pub fn undo(&mut self) {
        let mut before = self.undo.peek();
        loop {
            self.do_undo();
            if !self.options.group_undo {
                break;
            }
            let after = self.undo.peek();
            if after.is_none() || after != before {
                break;
            }
            before = after;
        }
    }

    /// Redo one previously undone group. A no-op once any new mutation has
    /// invalidated the redo stack.
    pub fn redo(&mut self) {
        if self.redo_invalidated {
            return;
        }
        if self.redo.peek().is_none() {
            return;
        }
        self.over_col = 0;
        // the redone group must undo as a single step
        self.push_action(UndoEntry::KeyPress(self.start_display));
        let mut popped = 0usize;
        let scroll = loop {
            match self.redo.pop() {
                None => break None,
                Some(UndoEntry::KeyPress(s)) => break Some(s),
                Some(entry) => {
                    self.apply_entry(entry);
                    popped += 1;
                }
            }
        };
        if let Some(s) = scroll {
            self.restore_scroll(s);
        }
        trace!(target: "document.undo", popped, hit_bottom = scroll.is_none(), "redo_group_replayed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::from_str(EditOptions::default(), text)
    }

    #[test]
    fn primitives_round_trip_cursor_and_size() {
        let mut d = doc("");
        for b in b"abc" {
            d.insert(*b);
        }
        assert_eq!(d.text(), "abc");
        assert_eq!(d.cursor(), 3);
        d.cursor_move(-2);
        assert_eq!(d.cursor(), 1);
        d.insert_ahead(b'X');
        assert_eq!(d.text(), "aXbc");
        assert_eq!(d.cursor(), 1);
        assert_eq!(d.delete_byte(), Some(b'X'));
        assert_eq!(d.backspace_byte(), Some(b'a'));
        assert_eq!(d.text(), "bc");
        assert_eq!(d.cursor(), 0);
    }

    #[test]
    fn modification_hook_fires_once() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct Counter(Rc<Cell<usize>>);
        impl DocumentHooks for Counter {
            fn modified(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let count = Rc::new(Cell::new(0));
        let mut d = doc("");
        d.set_hooks(Box::new(Counter(count.clone())));
        for b in b"hello world" {
            d.insert(*b);
        }
        d.backspace_byte();
        assert_eq!(count.get(), 1);
        assert!(d.is_modified());
        d.mark_saved();
        d.insert(b'!');
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn line_hooks_carry_line_numbers() {
        use std::cell::RefCell;
        use std::rc::Rc;

        #[derive(Default)]
        struct Log {
            inserted: Vec<usize>,
            removed: Vec<usize>,
        }
        struct Recorder(Rc<RefCell<Log>>);
        impl DocumentHooks for Recorder {
            fn line_inserted(&mut self, line: usize) {
                self.0.borrow_mut().inserted.push(line);
            }
            fn line_removed(&mut self, line: usize) {
                self.0.borrow_mut().removed.push(line);
            }
        }

        let log = Rc::new(RefCell::new(Log::default()));
        let mut d = doc("");
        d.set_hooks(Box::new(Recorder(log.clone())));
        for b in b"a\nb\n" {
            d.insert(*b);
        }
        assert_eq!(log.borrow().inserted, vec![0, 1]);
        d.backspace_byte(); // removes the second newline
        assert_eq!(log.borrow().removed, vec![2]);
    }

    #[test]
    fn undo_restores_content_cursor_and_lines() {
        let mut d = doc("");
        d.push_key_press();
        for b in b"one\ntwo" {
            d.insert(*b);
        }
        assert_eq!(d.line_count(), 2);
        d.undo();
        assert_eq!(d.text(), "");
        assert_eq!(d.cursor(), 0);
        assert_eq!(d.line_count(), 1);
        // stack bottomed out: a second undo is a no-op
        d.undo();
        assert_eq!(d.text(), "");
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut d = doc("base\n");
        d.push_key_press();
        for b in b"xy" {
            d.insert(*b);
        }
        d.push_key_press();
        d.cursor_move(-1);
        d.delete_byte();
        let after = d.text();
        let after_cursor = d.cursor();

        d.undo();
        d.undo();
        assert_eq!(d.text(), "base\n");
        assert_eq!(d.cursor(), 0);

        d.redo();
        d.redo();
        assert_eq!(d.text(), after);
        assert_eq!(d.cursor(), after_cursor);

        // and back again: redo re-recorded both groups on the undo side
        d.undo();
        d.undo();
        assert_eq!(d.text(), "base\n");
    }

    #[test]
    fn new_mutation_invalidates_redo() {
        let mut d = doc("");
        d.push_key_press();
        d.insert(b'a');
        d.undo();
        assert_eq!(d.text(), "");
        // a fresh mutation (armed like the dispatcher does) clears redo
        d.set_redo_invalidated(true);
        d.push_key_press();
        d.insert(b'z');
        d.set_redo_invalidated(false);
        d.redo();
        assert_eq!(d.text(), "z");
    }

    #[test]
    fn group_undo_collapses_identical_groups() {
        // group identity is the leading undo entry; repeated backspaces over
        // identical bytes produce identical groups
        let mut opts = EditOptions::default();
        opts.group_undo = true;
        let mut d = Document::from_str(opts, "aaaaaa");
        d.cursor_move(6);
        for _ in 0..3 {
            d.push_key_press();
            d.backspace_byte();
        }
        assert_eq!(d.text(), "aaa");
        d.undo();
        assert_eq!(d.text(), "aaaaaa");
    }

    #[test]
    fn without_group_undo_each_group_is_one_step() {
        let mut d = Document::from_str(EditOptions::default(), "aaaaaa");
        d.cursor_move(6);
        for _ in 0..3 {
            d.push_key_press();
            d.backspace_byte();
        }
        d.undo();
        assert_eq!(d.text(), "aaaa");
        d.undo();
        assert_eq!(d.text(), "aaaaa");
    }

    #[test]
    fn sticky_column_through_short_line() {
        let mut d = doc("a long first line\nx\nanother long line\n");
        d.cursor_move(10);
        d.update_prev_col();
        assert_eq!(d.curs_col(), 10);
        d.move_down(1, false);
        assert_eq!(d.curs_line(), 1);
        assert_eq!(d.curs_col(), 1); // clamped at the short line's end
        d.move_down(1, false);
        assert_eq!(d.curs_line(), 2);
        assert_eq!(d.curs_col(), 10); // restored on a long enough line
    }

    #[test]
    fn beyond_eol_virtual_column() {
        let mut opts = EditOptions::default();
        opts.cursor_beyond_eol = true;
        let mut d = Document::from_str(opts, "ab\nlonger line\n");
        d.cursor_move(2); // end of "ab"
        d.right_char_move();
        d.right_char_move();
        assert_eq!(d.over_col(), 2);
        assert_eq!(d.cursor(), 2);
        // typing materializes the virtual columns as spaces
        d.insert_over();
        d.insert(b'!');
        assert_eq!(d.text(), "ab  !\nlonger line\n");
    }

    #[test]
    fn move_up_from_first_line_is_noop() {
        let mut d = doc("one\ntwo\n");
        d.move_up(1, false);
        assert_eq!(d.cursor(), 0);
        d.move_up(10, false);
        assert_eq!(d.cursor(), 0);
    }

    #[test]
    fn move_down_clamps_at_last_line() {
        let mut d = doc("one\ntwo");
        d.move_down(99, false);
        assert_eq!(d.curs_line(), 1);
    }

    #[test]
    fn vertical_move_resnaps_to_wide_char_start() {
        // line 2 holds CJK from column 0; landing mid-character must settle
        // on the character's first byte
        let mut d = doc("abcd\n\u{4e16}\u{754c}x\n");
        d.cursor_move(3);
        d.update_prev_col();
        d.move_down(1, false);
        let p = d.cursor();
        let bol = d.buffer().get_bol(p);
        // cursor sits on a character boundary
        let mut q = bol;
        while q < p {
            let (_, len) = d.buffer().get_utf(q);
            q += len;
        }
        assert_eq!(q, p);
    }

    #[test]
    fn marks_follow_edits() {
        let mut d = doc("hello world");
        d.cursor_move(5);
        d.mark_cmd(false); // anchor at 5, following cursor
        d.cursor_move(3);
        assert_eq!(d.eval_marks(), Some((5, 8)));
        d.mark_cmd(false); // fix end at 8
        assert_eq!(d.mark2(), Some(8));
        // inserting before the selection shifts both marks
        d.cursor_move(-8);
        d.insert(b'>');
        assert_eq!(d.eval_marks(), Some((6, 9)));
        d.mark_cmd(true);
        assert!(!d.has_selection());
    }

    #[test]
    fn mark_word_selects_word_under_cursor() {
        let mut d = doc("foo bar_baz qux");
        d.cursor_move(6);
        d.mark_word();
        let (s, e) = d.eval_marks().unwrap();
        assert_eq!(&d.text()[s..e], "bar_baz");
    }

    #[test]
    fn mark_line_selects_line() {
        let mut d = doc("one\ntwo\nthree");
        d.move_to_line(1);
        d.mark_line();
        let (s, e) = d.eval_marks().unwrap();
        assert_eq!(&d.text()[s..e], "two");
    }

    #[test]
    fn undo_restores_marks() {
        let mut d = doc("abcdef");
        d.cursor_move(1);
        d.push_key_press();
        d.mark_cmd(false);
        d.cursor_move(3);
        d.mark_cmd(false);
        assert_eq!(d.eval_marks(), Some((1, 4)));
        // a delete pushes the markers, then mutates
        d.push_key_press();
        d.delete_byte();
        d.undo();
        assert_eq!(d.eval_marks(), Some((1, 4)));
    }

    #[test]
    fn bracket_matching() {
        let mut d = doc("fn f(a: (u8, u8)) {}");
        d.cursor_move(4); // on '('
        d.goto_matching_bracket();
        assert_eq!(d.buffer().get_byte(d.cursor()), b')');
        assert_eq!(d.cursor(), 16);
        d.goto_matching_bracket();
        assert_eq!(d.cursor(), 4);
    }

    #[test]
    fn scroll_anchor_restored_by_undo() {
        let mut d = doc(&"line\n".repeat(50));
        d.scroll_downward(10);
        assert_eq!(d.start_line(), 10);
        let anchor = d.start_display();
        d.push_key_press();
        d.move_to_line(30);
        d.insert(b'x');
        d.scroll_downward(15);
        assert_ne!(d.start_display(), anchor);
        d.undo();
        assert_eq!(d.start_display(), anchor);
        assert_eq!(d.start_line(), 10);
    }

    #[test]
    fn paragraph_movement() {
        let mut d = doc("para one a\npara one b\n\npara two a\npara two b\n\npara three\n");
        d.move_to_line(4);
        d.move_up_paragraph(false);
        assert_eq!(d.curs_line(), 2); // blank separator
        d.move_down_paragraph(false);
        assert_eq!(d.curs_line(), 5);
    }
}
