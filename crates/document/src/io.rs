//! Stream load and save.
//!
//! The core owns no file format: content bytes are opaque and arrive/leave
//! through caller-supplied streams. Loading is cancellable through the
//! progress callback; an aborted or failed load leaves whatever was read in
//! the buffer and the caller is expected to discard the document. Saving
//! iterates the content in offset order, optionally translating line breaks,
//! and reports how many bytes went out.

use crate::Document;
use edit_buffer::EditBuffer;
use edit_config::LineBreak;
use std::io::{ErrorKind, Read, Write};
use thiserror::Error;
use tracing::trace;

/// Bytes read between progress callback invocations.
const LOAD_CHUNK: usize = 64 * 1024;
/// Staged output size for save translation.
const SAVE_CHUNK: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read failed after {bytes_loaded} bytes")]
    Read {
        bytes_loaded: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("load aborted by caller after {bytes_loaded} bytes")]
    Aborted { bytes_loaded: u64 },
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("write failed after {bytes_written} bytes")]
    Write {
        bytes_written: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("short write after {bytes_written} bytes")]
    ShortWrite { bytes_written: u64 },
}

impl Document {
    /// Replace the content with bytes from `reader`. `size_hint` pre-sizes
    /// the buffer when the total is known. `progress` is invoked once per
    /// chunk with the running byte count; returning `false` aborts the load.
    /// On error or abort the already-read bytes stay in the buffer but the
    /// document must be discarded, not resumed.
    pub fn load_stream(
        &mut self,
        reader: &mut dyn Read,
        size_hint: Option<u64>,
        progress: &mut dyn FnMut(u64) -> bool,
    ) -> Result<u64, LoadError> {
        self.buffer = match size_hint {
            Some(n) => EditBuffer::with_capacity(n as usize),
            None => EditBuffer::new(),
        };
        self.cache.invalidate();
        self.undo.clear();
        self.redo.clear();
        self.set_markers(0, Some(0), 0, 0);
        self.end_mark_curs = None;
        self.column_highlight = false;
        self.over_col = 0;
        self.prev_col = 0;
        self.start_display = 0;
        self.start_line = 0;
        self.modified = false;
        self.redo_invalidated = false;
        self.recording = false;

        let mut loaded: u64 = 0;
        let mut chunk = vec![0u8; LOAD_CHUNK];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    self.buffer.append(&chunk[..n]);
                    loaded += n as u64;
                    if !progress(loaded) {
                        self.recording = true;
                        trace!(target: "document.io", loaded, "load_aborted");
                        return Err(LoadError::Aborted {
                            bytes_loaded: loaded,
                        });
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.recording = true;
                    trace!(target: "document.io", loaded, error = %e, "load_read_error");
                    return Err(LoadError::Read {
                        bytes_loaded: loaded,
                        source: e,
                    });
                }
            }
        }
        self.buffer.rewind();
        self.cache.invalidate();
        self.recording = true;
        trace!(target: "document.io", loaded, lines = self.buffer.line_count(), "load_done");
        Ok(loaded)
    }

    /// Write the content to `writer`, translating line breaks per
    /// `line_break`. Returns the number of translated bytes written.
    pub fn save_stream(
        &self,
        writer: &mut dyn Write,
        line_break: LineBreak,
    ) -> Result<u64, SaveError> {
        let mut out = SaveSink {
            writer,
            staged: Vec::with_capacity(SAVE_CHUNK),
            written: 0,
        };
        let size = self.buffer.size();

        if line_break == LineBreak::AsIs {
            for i in 0..size {
                out.put(self.buffer.get_byte(i))?;
            }
            out.flush()?;
            trace!(target: "document.io", written = out.written, "save_done");
            return Ok(out.written);
        }

        let mut i = 0usize;
        while i < size {
            let c = self.buffer.get_byte(i);
            if c != b'\n' && c != b'\r' {
                out.put(c)?;
                i += 1;
                continue;
            }
            // beyond-end reads yield the sentinel newline, which folds a
            // trailing lone CR into a pair exactly like the original editor
            let c1 = self.buffer.get_byte(i + 1);
            match line_break {
                LineBreak::Lf => {
                    out.put(b'\n')?;
                    i += 2;
                    if c == b'\r' && c1 == b'\n' {
                        continue; // Windows pair fully consumed
                    }
                    if c == b'\r' && c1 == b'\r' {
                        out.put(b'\n')?; // two Mac breaks
                        continue;
                    }
                    if i - 1 < size {
                        out.put(c1)?;
                    }
                }
                LineBreak::CrLf => {
                    out.put(b'\r')?;
                    out.put(b'\n')?;
                    i += 1;
                    if c == b'\r' && c1 == b'\n' {
                        i += 1;
                    }
                }
                LineBreak::Cr => {
                    out.put(b'\r')?;
                    i += 2;
                    if c == b'\r' && c1 == b'\n' {
                        continue;
                    }
                    if c == b'\n' && c1 == b'\n' {
                        out.put(b'\r')?; // two Unix breaks
                        continue;
                    }
                    if i - 1 < size {
                        out.put(c1)?;
                    }
                }
                LineBreak::AsIs => unreachable!("handled above"),
            }
        }
        out.flush()?;
        trace!(target: "document.io", written = out.written, "save_done");
        Ok(out.written)
    }
}

struct SaveSink<'a> {
    writer: &'a mut dyn Write,
    staged: Vec<u8>,
    written: u64,
}

impl SaveSink<'_> {
    fn put(&mut self, b: u8) -> Result<(), SaveError> {
        self.staged.push(b);
        if self.staged.len() >= SAVE_CHUNK {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SaveError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        match self.writer.write_all(&self.staged) {
            Ok(()) => {
                self.written += self.staged.len() as u64;
                self.staged.clear();
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::WriteZero => Err(SaveError::ShortWrite {
                bytes_written: self.written,
            }),
            Err(e) => Err(SaveError::Write {
                bytes_written: self.written,
                source: e,
            }),
        }
    }
}
