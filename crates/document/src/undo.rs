//! Run-length-compressed circular undo/redo stack.
//!
//! A stack records the reverse of every primitive mutation as a tagged entry.
//! Identical consecutive entries are collapsed into `[entry, Repeat(n)]`
//! where `n` is the total occurrence count, so holding an arrow key or
//! deleting a long run costs two slots instead of one per repetition.
//! `KeyPress` group markers are never run-extended; a duplicate group push is
//! dropped outright.
//!
//! Storage is a circular buffer whose capacity is always a power of two, so
//! index wrap-around is a mask. Three positions matter: `bottom` (oldest
//! retained slot), `pointer` (next write slot) and the implicit top at
//! `pointer - 1`. When a push is about to lap `bottom`, the oldest key-press
//! group is discarded by advancing `bottom` to the next group marker. The
//! buffer doubles when free slots run low, up to the configured ceiling;
//! past the ceiling the stack silently keeps its size and sheds oldest
//! groups instead (reduced undo depth is not an error).

use tracing::trace;

/// One recorded reverse action.
///
/// `Repeat` is a storage detail: it only ever follows another entry and is
/// expanded transparently by [`UndoLog::pop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoEntry {
    /// Re-insert this byte before the cursor (reverse of a delete-behind).
    InsertByte(u8),
    /// Re-insert this byte after the cursor (reverse of a delete-ahead).
    InsertAheadByte(u8),
    /// Remove the byte before the cursor (reverse of an insert).
    Backspace,
    /// Remove the byte at the cursor (reverse of an insert-ahead).
    Delete,
    CursorLeft,
    CursorRight,
    ColumnModeOn,
    ColumnModeOff,
    /// Restore the first selection mark.
    Mark1(usize),
    /// Restore the second selection mark (`None` = following the cursor).
    Mark2(Option<usize>),
    /// Restore the cursor snapshot used by cursor-following selections.
    MarkCursor(Option<usize>),
    /// Key-press group boundary carrying the display scroll offset at the
    /// time of the keystroke.
    KeyPress(usize),
    /// The preceding entry occurred this many times in total.
    Repeat(i64),
}

impl UndoEntry {
    /// Group markers delimit undo steps and are exempt from run-length
    /// compression.
    pub fn is_group(&self) -> bool {
        matches!(self, UndoEntry::KeyPress(_))
    }
}

/// Run counts stop extending here; a fresh entry is started instead. With
/// 64-bit counts the exact value is a guard, not an overflow boundary.
pub const REPEAT_LIMIT: i64 = 1_000_000_000;

const START_CAPACITY: usize = 32;
const GROW_RESERVE: usize = 10;
const MIN_CEILING: usize = 256;

// inert filler for unwritten slots
const FILLER: UndoEntry = UndoEntry::KeyPress(0);

#[derive(Debug, Clone)]
pub struct UndoLog {
    slots: Vec<UndoEntry>,
    bottom: usize,
    pointer: usize,
    max_entries: usize,
}

impl UndoLog {
    /// `max_entries` bounds the backing store; values below 256 are raised,
    /// and growth stops at the largest power of two not exceeding the bound.
    pub fn new(max_entries: usize) -> Self {
        Self {
            slots: vec![FILLER; START_CAPACITY],
            bottom: 0,
            pointer: 0,
            max_entries: max_entries.max(MIN_CEILING),
        }
    }

    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    fn next_index(&self, i: usize) -> usize {
        (i + 1) & self.mask()
    }

    fn prev_index(&self, i: usize) -> usize {
        (i + self.slots.len() - 1) & self.mask()
    }

    fn used_slots(&self) -> usize {
        (self.pointer + self.slots.len() - self.bottom) & self.mask()
    }

    fn free_slots(&self) -> usize {
        self.slots.len() - self.used_slots()
    }

    pub fn is_empty(&self) -> bool {
        self.pointer == self.bottom
    }

    pub fn clear(&mut self) {
        self.bottom = 0;
        self.pointer = 0;
    }

    /// Append an entry, run-extending or deduplicating against the current
    /// top, growing the store if needed, and shedding the oldest group when
    /// the ring is full.
    pub fn push(&mut self, entry: UndoEntry) {
        debug_assert!(!matches!(entry, UndoEntry::Repeat(_)));

        if self.free_slots() < GROW_RESERVE {
            self.grow();
        }

        let spm1 = self.prev_index(self.pointer);
        let spm2 = self.prev_index(spm1);
        if self.bottom != self.pointer && spm1 != self.bottom && spm2 != self.bottom {
            match self.slots[spm1] {
                UndoEntry::Repeat(n) => {
                    if self.slots[spm2] == entry && n < REPEAT_LIMIT {
                        if !entry.is_group() {
                            self.slots[spm1] = UndoEntry::Repeat(n + 1);
                        }
                        return;
                    }
                }
                top => {
                    if top == entry {
                        if entry.is_group() {
                            // repeated group markers are do-nothings
                            return;
                        }
                        self.slots[self.pointer] = UndoEntry::Repeat(2);
                        self.pointer = self.next_index(self.pointer);
                        self.discard_oldest_group_if_full();
                        return;
                    }
                }
            }
        }
        self.slots[self.pointer] = entry;
        self.pointer = self.next_index(self.pointer);
        self.discard_oldest_group_if_full();
    }

    /// Remove and return the most recent logical entry, consuming one
    /// repetition of a run at a time. `None` is the stack-bottom sentinel.
    pub fn pop(&mut self) -> Option<UndoEntry> {
        if self.pointer == self.bottom {
            return None;
        }
        let sp = self.prev_index(self.pointer);
        match self.slots[sp] {
            UndoEntry::Repeat(n) => {
                if sp == self.bottom {
                    return None;
                }
                let value = self.slots[self.prev_index(sp)];
                if n <= 2 {
                    // one repetition left: drop the run header
                    self.pointer = sp;
                } else {
                    self.slots[sp] = UndoEntry::Repeat(n - 1);
                }
                Some(value)
            }
            entry => {
                self.pointer = sp;
                Some(entry)
            }
        }
    }

    /// The entry [`UndoLog::pop`] would return, without consuming it.
    pub fn peek(&self) -> Option<UndoEntry> {
        if self.pointer == self.bottom {
            return None;
        }
        let sp = self.prev_index(self.pointer);
        match self.slots[sp] {
            UndoEntry::Repeat(_) => {
                if sp == self.bottom {
                    None
                } else {
                    Some(self.slots[self.prev_index(sp)])
                }
            }
            entry => Some(entry),
        }
    }

    fn grow(&mut self) {
        let cap = self.slots.len();
        if cap * 2 > self.max_entries {
            trace!(target: "document.undo", cap, max = self.max_entries, "undo_growth_capped");
            return;
        }
        // relocate the live window to the front of a fresh, doubled store
        let mut slots = Vec::with_capacity(cap * 2);
        let mut i = self.bottom;
        while i != self.pointer {
            slots.push(self.slots[i]);
            i = self.next_index(i);
        }
        let used = slots.len();
        slots.resize(cap * 2, FILLER);
        self.slots = slots;
        self.bottom = 0;
        self.pointer = used;
        trace!(target: "document.undo", cap = cap * 2, used, "undo_stack_grown");
    }

    /// Advance `bottom` past the oldest key-press group when the write
    /// pointer is about to lap it. Never splits a group: `bottom` only comes
    /// to rest on a group marker (or on `pointer`, leaving the stack empty
    /// when a single group filled the whole ring).
    fn discard_oldest_group_if_full(&mut self) {
        let guard = self.next_index(self.next_index(self.pointer));
        if guard != self.bottom && self.next_index(guard) != self.bottom {
            return;
        }
        trace!(target: "document.undo", "undo_oldest_group_discarded");
        loop {
            self.bottom = self.next_index(self.bottom);
            if self.bottom == self.pointer {
                self.bottom = 0;
                self.pointer = 0;
                return;
            }
            if self.slots[self.bottom].is_group() {
                return;
            }
        }
    }
}
