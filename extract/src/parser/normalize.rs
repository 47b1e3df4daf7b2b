//! Line normalization.
//!
//! Lines arrive already coalesced by the text extractor; this pass only
//! unifies line endings, expands tabs, maps exotic spaces to ASCII and
//! trims trailing whitespace. Leading whitespace is kept because column
//! offsets carry meaning for grid detection.

use super::IndexedLine;

const TAB_STOP: usize = 8;

/// Normalizes one line of text.
pub fn normalize_line(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut column = 0usize;

    for ch in raw.chars() {
        match ch {
            '\t' => {
                let pad = TAB_STOP - (column % TAB_STOP);
                out.extend(std::iter::repeat_n(' ', pad));
                column += pad;
            }
            '\r' | '\n' => {}
            '\u{00a0}' | '\u{2007}' | '\u{202f}' | '\u{3000}' => {
                out.push(' ');
                column += 1;
            }
            '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}' => {}
            _ => {
                out.push(ch);
                column += 1;
            }
        }
    }

    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out
}

/// Normalizes caller-provided lines, keeping their original indices.
///
/// A line that itself contains line breaks is split; the parts share the
/// original index.
pub fn normalize_lines<S: AsRef<str>>(lines: &[S]) -> Vec<IndexedLine> {
    let mut out = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        let unified = line.as_ref().replace("\r\n", "\n").replace('\r', "\n");
        for part in unified.split('\n') {
            out.push(IndexedLine {
                index,
                text: normalize_line(part),
            });
        }
    }
    out
}

/// Splits raw document text into normalized, indexed lines.
pub fn normalize_text(raw: &str) -> Vec<IndexedLine> {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .enumerate()
        .map(|(index, text)| IndexedLine {
            index,
            text: normalize_line(text),
        })
        .collect()
}
