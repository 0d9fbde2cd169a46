//! Command dispatch: one logical editing command in, a sequence of document
//! primitives out.
//!
//! The dispatcher owns the policy glue the primitives don't know about:
//! key-press grouping for undo, the selection-mark state machine
//! (mark-extending commands start/continue a highlight, everything else ends
//! or clears it), overwrite mode, materializing beyond-EOL virtual columns,
//! and the sticky-column bookkeeping that vertical motions rely on.
//!
//! Two entry points, mirroring how a UI drives the core:
//! * [`Dispatcher::execute_key`] — one user keystroke: records an undo group
//!   boundary first (except for Undo/Redo, which must not open a group).
//! * [`Dispatcher::execute`] — a command at a lower level; many calls undo
//!   as a single step. Paste uses this internally so a pasted block is one
//!   group.

use edit_document::{Document, UndoEntry};
use tracing::trace;

pub mod block;
pub mod words;

/// Logical editing commands. Mark variants extend the selection while
/// moving; MarkColumn variants additionally switch to rectangular mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Top,
    Bottom,
    PageUp,
    PageDown,
    WordLeft,
    WordRight,
    ParagraphUp,
    ParagraphDown,
    GoToLine(usize),
    MatchBracket,

    Mark,
    MarkColumn,
    Unmark,
    MarkAll,
    MarkWord,
    MarkLine,
    MarkLeft,
    MarkRight,
    MarkUp,
    MarkDown,
    MarkToHome,
    MarkToEnd,
    MarkPageUp,
    MarkPageDown,
    MarkColumnLeft,
    MarkColumnRight,
    MarkColumnUp,
    MarkColumnDown,

    InsertChar(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    DeleteWordLeft,
    DeleteWordRight,
    DeleteLine,
    DeleteToHome,
    DeleteToEnd,
    ToggleOverwrite,

    BlockShiftLeft,
    BlockShiftRight,
    BlockDelete,
    Paste(String),

    Undo,
    Redo,
}

impl Command {
    /// Shift/alt-arrow style commands that extend the selection.
    fn extends_selection(&self) -> bool {
        matches!(
            self,
            Command::MarkLeft
                | Command::MarkRight
                | Command::MarkUp
                | Command::MarkDown
                | Command::MarkToHome
                | Command::MarkToEnd
                | Command::MarkPageUp
                | Command::MarkPageDown
                | Command::MarkColumnLeft
                | Command::MarkColumnRight
                | Command::MarkColumnUp
                | Command::MarkColumnDown
        )
    }

    /// Plain movement commands that drop a non-persistent selection.
    fn is_plain_movement(&self) -> bool {
        matches!(
            self,
            Command::Up
                | Command::Down
                | Command::Left
                | Command::Right
                | Command::Home
                | Command::End
                | Command::Top
                | Command::Bottom
                | Command::PageUp
                | Command::PageDown
                | Command::WordLeft
                | Command::WordRight
        )
    }

    /// Vertical motions keep the sticky column; everything else re-anchors
    /// it at the landing position.
    fn keeps_sticky_column(&self) -> bool {
        matches!(
            self,
            Command::Up
                | Command::Down
                | Command::PageUp
                | Command::PageDown
                | Command::Top
                | Command::Bottom
                | Command::ParagraphUp
                | Command::ParagraphDown
                | Command::MarkUp
                | Command::MarkDown
                | Command::MarkPageUp
                | Command::MarkPageDown
                | Command::MarkColumnUp
                | Command::MarkColumnDown
        )
    }
}

/// Whether dispatching changed anything a renderer would care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    pub dirty: bool,
}

impl DispatchResult {
    pub fn dirty() -> Self {
        Self { dirty: true }
    }
    pub fn clean() -> Self {
        Self { dirty: false }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    /// Rows jumped by PageUp/PageDown; the embedding UI keeps this at its
    /// text-area height.
    pub page_lines: usize,
    /// A mark-extending command sequence is in progress.
    highlight: bool,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    cursor: usize,
    size: usize,
    line: usize,
    over_col: usize,
    mark1: usize,
    mark2: Option<usize>,
    column_highlight: bool,
    overwrite: bool,
}

impl Fingerprint {
    fn of(doc: &Document) -> Self {
        Self {
            cursor: doc.cursor(),
            size: doc.size(),
            line: doc.curs_line(),
            over_col: doc.over_col(),
            mark1: doc.mark1(),
            mark2: doc.mark2(),
            column_highlight: doc.column_highlight(),
            overwrite: doc.overwrite(),
        }
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            page_lines: 24,
            highlight: false,
        }
    }

    /// Execute a command as a user keystroke: opens a fresh undo group
    /// (except for Undo/Redo) before dispatching.
    pub fn execute_key(&mut self, doc: &mut Document, cmd: Command) -> DispatchResult {
        if !matches!(cmd, Command::Undo | Command::Redo) {
            doc.push_key_press();
        }
        self.execute(doc, cmd)
    }

    /// Execute a command without opening an undo group; repeated calls undo
    /// as one step.
    pub fn execute(&mut self, doc: &mut Document, cmd: Command) -> DispatchResult {
        let before = Fingerprint::of(doc);

        // selection policy: mark commands keep or start a highlight run,
        // anything else fixes the pending endpoint
        if cmd.extends_selection() {
            doc.set_column_highlight(false);
            if !self.highlight || (doc.mark2().is_some() && doc.has_selection()) {
                doc.mark_cmd(true);
                doc.mark_cmd(false);
            }
            self.highlight = true;
        } else {
            if self.highlight {
                doc.mark_cmd(false);
            }
            self.highlight = false;
        }

        match cmd {
            Command::Undo => {
                doc.set_redo_invalidated(false);
                doc.undo();
                return self.finish(doc, before, &cmd);
            }
            Command::Redo => {
                doc.set_redo_invalidated(false);
                doc.redo();
                return self.finish(doc, before, &cmd);
            }
            _ => doc.set_redo_invalidated(true),
        }

        if let Command::InsertChar(ch) = cmd {
            self.insert_char(doc, ch);
            return self.finish(doc, before, &cmd);
        }

        // plain movement drops a fixed, non-persistent selection
        if cmd.is_plain_movement()
            && !doc.options().persistent_selections
            && doc.mark2().is_some()
        {
            if doc.column_highlight() {
                doc.record_action(UndoEntry::ColumnModeOn);
                doc.set_column_highlight(false);
            }
            doc.mark_cmd(true);
        }

        match cmd {
            Command::Backspace => {
                if !doc.options().persistent_selections && doc.has_selection() {
                    block::block_delete(doc);
                } else if doc.options().cursor_beyond_eol && doc.over_col() > 0 {
                    doc.set_over_col(doc.over_col() - 1);
                } else {
                    doc.backspace_char();
                }
            }
            Command::Delete => {
                if !doc.options().persistent_selections && doc.has_selection() {
                    block::block_delete(doc);
                } else {
                    if doc.options().cursor_beyond_eol && doc.over_col() > 0 {
                        doc.insert_over();
                    }
                    doc.delete_char();
                }
            }
            Command::DeleteWordLeft => {
                doc.set_over_col(0);
                words::left_delete_word(doc);
            }
            Command::DeleteWordRight => {
                if doc.options().cursor_beyond_eol && doc.over_col() > 0 {
                    doc.insert_over();
                }
                words::right_delete_word(doc);
            }
            Command::DeleteLine => {
                // right half, the newline, then the left half; the sentinel
                // newline beyond both buffer ends bounds the loops
                while doc.buffer().get_current_byte() != b'\n' {
                    if doc.delete_byte().is_none() {
                        break;
                    }
                }
                doc.delete_byte();
                while doc.buffer().get_previous_byte() != b'\n' {
                    if doc.backspace_byte().is_none() {
                        break;
                    }
                }
            }
            Command::DeleteToHome => {
                while doc.buffer().get_previous_byte() != b'\n' && doc.cursor() > 0 {
                    doc.backspace_byte();
                }
            }
            Command::DeleteToEnd => {
                while doc.buffer().get_current_byte() != b'\n' && doc.cursor() < doc.size() {
                    doc.delete_byte();
                }
            }
            Command::Enter => {
                doc.set_over_col(0);
                doc.insert(b'\n');
                if doc.options().auto_indent {
                    doc.auto_indent();
                }
            }
            Command::Tab => {
                if doc.has_selection() && !doc.options().persistent_selections {
                    if doc.mark2().is_none() {
                        doc.mark_cmd(false);
                    }
                    block::shift_right(doc);
                } else {
                    if doc.options().cursor_beyond_eol && doc.over_col() > 0 {
                        doc.insert_over();
                    }
                    if doc.options().fill_tabs_with_spaces {
                        let tab = doc.options().tab_width;
                        let col = doc.curs_col();
                        for _ in 0..(tab - col % tab) {
                            doc.insert(b' ');
                        }
                    } else {
                        doc.insert(b'\t');
                    }
                }
            }
            Command::ToggleOverwrite => {
                doc.set_overwrite(!doc.overwrite());
            }

            Command::Left | Command::MarkLeft => doc.left_char_move(),
            Command::MarkColumnLeft => {
                doc.set_column_highlight(true);
                doc.left_char_move();
            }
            Command::Right | Command::MarkRight => doc.right_char_move(),
            Command::MarkColumnRight => {
                doc.set_column_highlight(true);
                doc.right_char_move();
            }
            Command::Up | Command::MarkUp => doc.move_up(1, false),
            Command::MarkColumnUp => {
                doc.set_column_highlight(true);
                doc.move_up(1, false);
            }
            Command::Down | Command::MarkDown => doc.move_down(1, false),
            Command::MarkColumnDown => {
                doc.set_column_highlight(true);
                doc.move_down(1, false);
            }
            Command::PageUp | Command::MarkPageUp => doc.move_up(self.page_lines, true),
            Command::PageDown | Command::MarkPageDown => doc.move_down(self.page_lines, true),
            Command::Home | Command::MarkToHome => doc.cursor_to_bol(),
            Command::End | Command::MarkToEnd => doc.cursor_to_eol(),
            Command::Top => doc.move_to_top(),
            Command::Bottom => doc.move_to_bottom(),
            Command::WordLeft => {
                doc.set_over_col(0);
                words::left_word_move(doc);
            }
            Command::WordRight => {
                doc.set_over_col(0);
                words::right_word_move(doc);
            }
            Command::ParagraphUp => doc.move_up_paragraph(false),
            Command::ParagraphDown => doc.move_down_paragraph(false),
            Command::GoToLine(line) => doc.move_to_line(line),
            Command::MatchBracket => doc.goto_matching_bracket(),

            Command::Mark => {
                if doc.mark2().is_some() {
                    if doc.column_highlight() {
                        doc.record_action(UndoEntry::ColumnModeOn);
                    }
                    doc.set_column_highlight(false);
                }
                doc.mark_cmd(false);
            }
            Command::MarkColumn => {
                if !doc.column_highlight() {
                    doc.record_action(UndoEntry::ColumnModeOff);
                }
                doc.set_column_highlight(true);
                doc.mark_cmd(false);
            }
            Command::Unmark => {
                if doc.column_highlight() {
                    doc.record_action(UndoEntry::ColumnModeOn);
                }
                doc.set_column_highlight(false);
                doc.mark_cmd(true);
            }
            Command::MarkAll => {
                doc.set_markers(0, Some(doc.size()), 0, 0);
            }
            Command::MarkWord => {
                if doc.column_highlight() {
                    doc.record_action(UndoEntry::ColumnModeOn);
                }
                doc.set_column_highlight(false);
                doc.mark_word();
            }
            Command::MarkLine => {
                if doc.column_highlight() {
                    doc.record_action(UndoEntry::ColumnModeOn);
                }
                doc.set_column_highlight(false);
                doc.mark_line();
            }

            Command::BlockShiftLeft => {
                if doc.has_selection() {
                    block::shift_left(doc);
                }
            }
            Command::BlockShiftRight => {
                if doc.has_selection() {
                    block::shift_right(doc);
                }
            }
            Command::BlockDelete => block::block_delete(doc),
            Command::Paste(ref text) => {
                if !doc.options().persistent_selections && doc.has_selection() {
                    block::block_delete(doc);
                }
                if doc.options().cursor_beyond_eol && doc.over_col() > 0 {
                    doc.insert_over();
                }
                for ch in text.chars() {
                    insert_char_encoded(doc, ch);
                }
            }

            // handled before the match
            Command::InsertChar(_) | Command::Undo | Command::Redo => {}
        }

        self.finish(doc, before, &cmd)
    }

    fn insert_char(&mut self, doc: &mut Document, ch: char) {
        if !doc.options().persistent_selections && doc.has_selection() {
            block::block_delete(doc);
        }
        if doc.overwrite() {
            // one character consumed per character typed, never a newline;
            // delete_char removes the whole multi-byte sequence at once
            if doc.buffer().get_current_byte() != b'\n' {
                doc.delete_char();
            }
        }
        if doc.options().cursor_beyond_eol && doc.over_col() > 0 {
            doc.insert_over();
        }
        insert_char_encoded(doc, ch);
    }

    fn finish(&self, doc: &mut Document, before: Fingerprint, cmd: &Command) -> DispatchResult {
        if !cmd.keeps_sticky_column() {
            doc.update_prev_col();
        }
        let after = Fingerprint::of(doc);
        let dirty = before != after;
        trace!(target: "commands.dispatch", ?cmd, dirty, cursor = doc.cursor(), "dispatched");
        if dirty {
            DispatchResult::dirty()
        } else {
            DispatchResult::clean()
        }
    }
}

/// Insert one character, re-encoding input above 0x7F as UTF-8 when the
/// document is UTF-8 (8-bit terminals hand the core bare Latin-1 bytes).
fn insert_char_encoded(doc: &mut Document, ch: char) {
    let code = ch as u32;
    if code < 0x80 {
        doc.insert(ch as u8);
    } else if doc.options().utf8 {
        let mut buf = [0u8; 4];
        for b in ch.encode_utf8(&mut buf).bytes() {
            doc.insert(b);
        }
    } else if code < 0x100 {
        doc.insert(code as u8);
    } else {
        // unrepresentable in the 8-bit document
        doc.insert(b'.');
    }
}
