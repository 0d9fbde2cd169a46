//! Line-number to byte-offset cache.
//!
//! Answering "where does line N start" from scratch is a scan from offset 0.
//! This cache keeps a handful of exact (line, offset) anchors so that most
//! lookups scan only the distance to the nearest anchor. Slots 0..3 are
//! rebuilt on every invalidation and always hold line 0, the cursor's line
//! and the last line; the remaining slots are a working pool replaced
//! pseudo-randomly on miss. A query one line away from a working slot reuses
//! that same slot, so an iterating caller stays in one slot instead of
//! churning the pool.
//!
//! Invalidation is coarse: one flag for the whole cache, set by any buffer
//! mutation.

use crate::EditBuffer;

const N_SLOTS: usize = 32;
const FIXED_SLOTS: usize = 3;

#[derive(Debug, Clone)]
pub struct LineCache {
    line_numbers: [usize; N_SLOTS],
    line_offsets: [usize; N_SLOTS],
    valid: bool,
    rng_state: u32,
}

impl Default for LineCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCache {
    pub fn new() -> Self {
        Self {
            line_numbers: [0; N_SLOTS],
            line_offsets: [0; N_SLOTS],
            valid: false,
            rng_state: 0x9e37_79b9,
        }
    }

    /// Drop all anchors. Cheap; called on every document mutation.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Byte offset of the first byte of `line`. Lines at or past the last
    /// line resolve to the last line's start.
    pub fn offset_for_line(&mut self, buf: &EditBuffer, line: usize) -> usize {
        if !self.valid {
            self.line_numbers = [0; N_SLOTS];
            self.line_offsets = [0; N_SLOTS];
            // three anchors we know exactly: line 0, the cursor line, the last line
            self.line_numbers[1] = buf.curs_line();
            self.line_offsets[1] = buf.get_current_bol();
            self.line_numbers[2] = buf.last_line();
            self.line_offsets[2] = buf.get_bol(buf.size());
            self.valid = true;
        }
        if line >= buf.last_line() {
            return self.line_offsets[2];
        }
        if line == 0 {
            return 0;
        }

        let mut best = 0usize;
        let mut best_dist = usize::MAX;
        for (i, &n) in self.line_numbers.iter().enumerate() {
            let dist = n.abs_diff(line);
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        if best_dist == 0 {
            return self.line_offsets[best];
        }

        // one line off and already in the working pool: stay in this slot, the
        // caller is probably iterating
        let slot = if best_dist == 1 && best >= FIXED_SLOTS {
            best
        } else {
            FIXED_SLOTS + self.next_rand() as usize % (N_SLOTS - FIXED_SLOTS)
        };

        let anchor_line = self.line_numbers[best];
        let anchor_offset = self.line_offsets[best];
        let offset = if line > anchor_line {
            buf.forward_offset(anchor_offset, line - anchor_line)
        } else {
            buf.backward_offset(anchor_offset, anchor_line - line)
        };
        self.line_numbers[slot] = line;
        self.line_offsets[slot] = offset;
        offset
    }

    // xorshift32; the eviction choice only has to be spread out, not random
    fn next_rand(&mut self) -> u32 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng_state = x;
        x
    }
}
