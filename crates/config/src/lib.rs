//! Editor options loaded from a TOML file.
//!
//! Every knob has a serde default so a missing file, an empty file and a
//! partial file all work; unknown keys are ignored so older binaries accept
//! newer configs. Nothing here is global state: callers own an
//! [`EditOptions`] per editing session and hand it to the document and
//! dispatcher layers.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Line-break style applied when saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineBreak {
    /// Write bytes untranslated.
    #[default]
    AsIs,
    /// Translate `\r\n` and `\r` to `\n`.
    Lf,
    /// Translate `\n` and `\r` to `\r\n`.
    CrLf,
    /// Translate `\r\n` and `\n` to `\r`.
    Cr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditOptions {
    /// Columns per tab stop.
    pub tab_width: usize,
    /// Tab key inserts spaces up to the next stop instead of a hard tab.
    pub fill_tabs_with_spaces: bool,
    /// Cursor may rest past the end of a line; columns beyond the last
    /// character are virtual until something is typed there.
    pub cursor_beyond_eol: bool,
    /// Selections survive cursor movement and editing commands.
    pub persistent_selections: bool,
    /// One undo keystroke undoes a run of identical key-press groups.
    pub group_undo: bool,
    /// Enter copies the previous line's leading whitespace.
    pub auto_indent: bool,
    /// Ceiling for one undo/redo stack, in entries.
    pub max_undo_entries: usize,
    /// Treat the document as UTF-8 for character-wise movement and input
    /// re-encoding.
    pub utf8: bool,
    /// Line-break translation on save.
    pub line_break: LineBreak,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            tab_width: 8,
            fill_tabs_with_spaces: false,
            cursor_beyond_eol: false,
            persistent_selections: true,
            group_undo: false,
            auto_indent: false,
            max_undo_entries: 32768,
            utf8: true,
            line_break: LineBreak::AsIs,
        }
    }
}

impl EditOptions {
    /// Load options from a TOML file. A missing file yields the defaults;
    /// unreadable or unparsable content is an error.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(target: "config", path = %path.display(), "config_absent_using_defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let opts: Self =
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
        if opts.tab_width == 0 {
            anyhow::bail!("tab_width must be at least 1 in {}", path.display());
        }
        info!(target: "config", path = %path.display(), tab_width = opts.tab_width, "config_loaded");
        Ok(opts)
    }
}
