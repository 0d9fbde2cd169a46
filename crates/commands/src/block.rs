//! Block (selection) operations: shift and delete.
//!
//! In column mode these walk the selected lines bottom-up so that edits on a
//! line never shift the offsets of lines still to be visited. Blank lines
//! are skipped when shifting; a rectangle delete clips each line to the
//! recorded column interval and never eats a newline.

use edit_buffer::column;
use edit_document::Document;

fn insert_spaces_to_next_stop(doc: &mut Document) {
    let tab = doc.options().tab_width;
    let col = doc.curs_col();
    let mut n = (col / tab + 1) * tab - col;
    while n > 0 {
        doc.insert(b' ');
        n -= 1;
    }
}

/// Insert the fill character (tab or spaces) at the start of every non-blank
/// line in the selection.
pub fn shift_right(doc: &mut Document) {
    let Some((start, end)) = doc.eval_marks() else {
        return;
    };
    let start_bol = doc.buffer().get_bol(start);
    let mut cur_bol = doc.buffer().get_bol(end.saturating_sub(1));
    loop {
        doc.cursor_move(cur_bol as isize - doc.cursor() as isize);
        let line = doc.curs_line();
        if !doc.line_is_blank(line) {
            if doc.options().fill_tabs_with_spaces {
                insert_spaces_to_next_stop(doc);
            } else {
                doc.insert(b'\t');
            }
            let b = doc.buffer().get_bol(cur_bol);
            doc.cursor_move(b as isize - doc.cursor() as isize);
        }
        if cur_bol == 0 {
            break;
        }
        cur_bol = doc.buffer().get_bol(cur_bol - 1);
        if cur_bol < start_bol {
            break;
        }
    }
}

/// Remove up to one tab stop of leading whitespace from every line in the
/// selection.
pub fn shift_left(doc: &mut Document) {
    let Some((start, end)) = doc.eval_marks() else {
        return;
    };
    let tab = doc.options().tab_width;
    let start_bol = doc.buffer().get_bol(start);
    let mut cur_bol = doc.buffer().get_bol(end.saturating_sub(1));
    loop {
        doc.cursor_move(cur_bol as isize - doc.cursor() as isize);
        let next = doc.buffer().get_current_byte();
        if next == b'\t' {
            doc.delete_byte();
        } else if next == b' ' {
            for _ in 0..tab {
                if doc.buffer().get_current_byte() != b' ' {
                    break;
                }
                doc.delete_byte();
            }
        }
        if cur_bol == 0 {
            break;
        }
        cur_bol = doc.buffer().get_bol(cur_bol - 1);
        if cur_bol < start_bol {
            break;
        }
    }
}

/// Delete the selection: the plain byte range, or per-line column intervals
/// in column mode.
pub fn block_delete(doc: &mut Document) {
    let Some((start, end)) = doc.eval_marks() else {
        return;
    };
    doc.push_markers();
    if doc.column_highlight() {
        let (c1, c2) = doc.mark_columns();
        let (c1, c2) = (c1.min(c2), c1.max(c2));
        let tab = doc.options().tab_width;
        let start_bol = doc.buffer().get_bol(start);
        let mut cur_bol = doc.buffer().get_bol(end.saturating_sub(1));
        loop {
            let from = column::offset_at_column(doc.buffer(), cur_bol, c1, tab);
            let to = column::offset_at_column(doc.buffer(), cur_bol, c2, tab);
            doc.cursor_move(from as isize - doc.cursor() as isize);
            for _ in from..to {
                if doc.buffer().get_current_byte() == b'\n' {
                    break;
                }
                if doc.delete_byte().is_none() {
                    break;
                }
            }
            if cur_bol == 0 {
                break;
            }
            cur_bol = doc.buffer().get_bol(cur_bol - 1);
            if cur_bol < start_bol {
                break;
            }
        }
    } else {
        doc.cursor_move(start as isize - doc.cursor() as isize);
        for _ in start..end {
            if doc.delete_byte().is_none() {
                break;
            }
        }
    }
    doc.set_markers(0, Some(0), 0, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use edit_config::EditOptions;

    fn doc(text: &str) -> Document {
        Document::from_str(EditOptions::default(), text)
    }

    #[test]
    fn stream_block_delete() {
        let mut d = doc("hello cruel world");
        d.set_markers(5, Some(11), 0, 0);
        block_delete(&mut d);
        assert_eq!(d.text(), "hello world");
        assert!(!d.has_selection());
    }

    #[test]
    fn shift_right_skips_blank_lines() {
        let mut d = doc("alpha\n\nbeta\n");
        d.set_markers(0, Some(11), 0, 0);
        shift_right(&mut d);
        assert_eq!(d.text(), "\talpha\n\n\tbeta\n");
    }

    #[test]
    fn shift_right_with_spaces() {
        let mut opts = EditOptions::default();
        opts.fill_tabs_with_spaces = true;
        opts.tab_width = 4;
        let mut d = Document::from_str(opts, "one\ntwo\n");
        d.set_markers(0, Some(7), 0, 0);
        shift_right(&mut d);
        assert_eq!(d.text(), "    one\n    two\n");
    }

    #[test]
    fn shift_left_removes_tab_or_spaces() {
        let mut d = doc("\tone\n        two\nthree\n");
        let end = d.size() - 1;
        d.set_markers(0, Some(end), 0, 0);
        shift_left(&mut d);
        assert_eq!(d.text(), "one\ntwo\nthree\n");
    }

    #[test]
    fn column_delete_clips_per_line() {
        let mut d = doc("abcdef\nxy\nmnopqr\n");
        // rectangle columns 2..4 over all three lines
        d.set_markers(2, Some(14), 2, 4);
        d.set_column_highlight(true);
        block_delete(&mut d);
        // line 2 ("xy") only has column 2 onward clipped to its end
        assert_eq!(d.text(), "abef\nxy\nmnqr\n");
    }
}
