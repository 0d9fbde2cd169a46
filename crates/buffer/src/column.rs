//! Visual-column arithmetic.
//!
//! Columns are terminal cells: tabs expand to the next multiple of the tab
//! width, control bytes (including DEL) occupy two cells rendered as a caret
//! sequence, wide characters occupy two cells per `unicode-width`, and every
//! other character one cell. Both walks stop at a newline.

use crate::EditBuffer;
use unicode_width::UnicodeWidthChar;

pub const DEFAULT_TAB_WIDTH: usize = 8;

/// Cells occupied by `c` when it starts at column `col`.
fn cell_width(c: char, col: usize, tab_width: usize) -> usize {
    if c == '\t' {
        tab_width - col % tab_width
    } else if c < ' ' || c == '\u{7f}' {
        // caret notation: ^M, ^[ and friends take two cells
        2
    } else {
        match c.width() {
            Some(w) if w >= 2 => 2,
            _ => 1,
        }
    }
}

/// Visual column of `upto`, walking from `from` (normally a BOL). Stops early
/// at a newline or the end of the buffer.
pub fn column_at(buf: &EditBuffer, from: usize, upto: usize, tab_width: usize) -> usize {
    let mut col = 0;
    let mut p = from;
    while p < upto && p < buf.size() {
        let (c, len) = buf.get_utf(p);
        if c == '\n' {
            break;
        }
        col += cell_width(c, col, tab_width);
        p += len;
    }
    col
}

/// Inverse of [`column_at`]: the offset reached by walking from `from` until
/// `target_col`. A target inside a multi-cell character (tab, wide char)
/// yields the offset of that character's first byte; a target past the end of
/// the line yields the newline offset.
pub fn offset_at_column(buf: &EditBuffer, from: usize, target_col: usize, tab_width: usize) -> usize {
    let mut col = 0;
    let mut p = from;
    loop {
        if col >= target_col || p >= buf.size() {
            return p;
        }
        let (c, len) = buf.get_utf(p);
        if c == '\n' {
            return p;
        }
        let w = cell_width(c, col, tab_width);
        if col + w > target_col {
            return p;
        }
        col += w;
        p += len;
    }
}
