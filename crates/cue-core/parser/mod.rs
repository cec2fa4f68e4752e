//! Reference grammar front ends.
//!
//! Two text formats are understood out of the box:
//!
//! - [`transcript`] — flat, one statement per line: `word [start, end] [id]`.
//! - [`script`] — nested cue scripts with block statements
//!   (`word { // offset, [id]` ... `} // offset, [id]`) and leaf statements
//!   (`word // offset, [id]`), indented four spaces per nesting level.
//!
//! Both parsers produce nodes that pair each statement with the byte spans
//! the synchronizers need: the whole statement's text span (deletion target),
//! the embedded time token span(s) (replacement target) and insertion
//! anchors. Parsing is purely lexical; ordering and nesting invariants are
//! checked separately by [`crate::order`], which the `collect` helpers wire
//! up.

use core::ops::Range;

pub mod script;
pub mod transcript;

/// Byte cursor over a single line. ASCII structure only; words may still be
/// arbitrary UTF-8 because the cursor never splits them.
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(line: &'a str, pos: usize) -> Self {
        Self {
            bytes: line.as_bytes(),
            pos,
        }
    }

    pub(crate) const fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Consume `expected` if it is the next byte.
    pub(crate) fn eat(&mut self, expected: u8) -> bool {
        if self.pos < self.bytes.len() && self.bytes[self.pos] == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Parse a signed decimal integer, returning its value and byte span
    /// within the line.
    pub(crate) fn int(&mut self) -> Option<(i64, Range<usize>)> {
        let start = self.pos;
        if self.pos < self.bytes.len() && self.bytes[self.pos] == b'-' {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos == digits_start {
            self.pos = start;
            return None;
        }
        let text = core::str::from_utf8(&self.bytes[start..self.pos]).ok()?;
        let value = text.parse().ok()?;
        Some((value, start..self.pos))
    }

    /// Whether only whitespace remains.
    pub(crate) fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.pos == self.bytes.len()
    }
}

/// Iterate `text` line by line with the byte offset of each line start and
/// the offset one past its terminating newline (or end of text).
pub(crate) fn lines_with_spans(text: &str) -> impl Iterator<Item = (usize, &str, usize)> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        (start, raw.trim_end_matches('\n'), offset)
    })
}
