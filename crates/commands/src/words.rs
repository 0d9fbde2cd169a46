//! Word-wise movement and deletion.
//!
//! Two adjacent bytes belong to the same word iff their class masks
//! intersect (see `edit_buffer::words`); a space-to-non-space transition
//! also ends a word. All loops run on the document primitives so every step
//! is undoable.

use edit_buffer::words::{is_space, word_class};
use edit_document::Document;

/// Move left to the start of the previous word.
pub fn left_word_move(doc: &mut Document) {
    loop {
        if doc.column_highlight()
            && doc.has_selection()
            && doc.over_col() == 0
            && doc.cursor() == doc.buffer().get_current_bol()
        {
            break;
        }
        doc.cursor_move(-1);
        if doc.cursor() == 0 {
            break;
        }
        let c1 = doc.buffer().get_previous_byte();
        if c1 == b'\n' {
            break;
        }
        let c2 = doc.buffer().get_current_byte();
        if c2 == b'\n' {
            break;
        }
        if word_class(c1) & word_class(c2) == 0 {
            break;
        }
        if is_space(c1) && !is_space(c2) {
            break;
        }
    }
}

/// Move right past the end of the current word.
pub fn right_word_move(doc: &mut Document) {
    loop {
        if doc.column_highlight()
            && doc.has_selection()
            && doc.over_col() == 0
            && doc.cursor() == doc.buffer().get_current_eol()
        {
            break;
        }
        doc.cursor_move(1);
        if doc.cursor() >= doc.size() {
            break;
        }
        let c1 = doc.buffer().get_previous_byte();
        if c1 == b'\n' {
            break;
        }
        let c2 = doc.buffer().get_current_byte();
        if c2 == b'\n' {
            break;
        }
        if word_class(c1) & word_class(c2) == 0 {
            break;
        }
        if is_space(c1) && !is_space(c2) {
            break;
        }
    }
}

/// Delete from the cursor to the end of the current word.
pub fn right_delete_word(doc: &mut Document) {
    while doc.cursor() < doc.size() {
        let Some(c1) = doc.delete_byte() else { break };
        if c1 == b'\n' {
            break;
        }
        let c2 = doc.buffer().get_current_byte();
        if c2 == b'\n' {
            break;
        }
        if is_space(c1) != is_space(c2) {
            break;
        }
        if word_class(c1) & word_class(c2) == 0 {
            break;
        }
    }
}

/// Delete from the cursor back to the start of the current word.
pub fn left_delete_word(doc: &mut Document) {
    while doc.cursor() > 0 {
        let Some(c1) = doc.backspace_byte() else { break };
        if c1 == b'\n' {
            break;
        }
        let c2 = doc.buffer().get_previous_byte();
        if c2 == b'\n' {
            break;
        }
        if is_space(c1) != is_space(c2) {
            break;
        }
        if word_class(c1) & word_class(c2) == 0 {
            break;
        }
    }
}
