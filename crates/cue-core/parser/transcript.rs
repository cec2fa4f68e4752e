//! Flat transcript grammar: `word [start, end] [id]`, one statement per line.

use core::ops::Range;

use crate::errors::{CoreError, Result};
use crate::order::{LineOrder, OrderValidator};
use crate::parser::{lines_with_spans, Cursor};
use crate::statement::Statement;
use crate::time::TimeRange;

/// A parsed transcript line together with the byte spans the synchronizer
/// edits: the whole line (including its newline) and the `[start, end]`
/// time token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNode {
    pub statement: Statement,
    pub span: Range<usize>,
    pub time_span: Range<usize>,
}

/// Parse transcript text into line nodes. Lexical only; see [`collect`] for
/// the order-checked variant the synchronizers use.
pub fn parse(text: &str) -> Result<Vec<LineNode>> {
    let mut nodes = Vec::new();
    for (line_no, (line_start, line, line_end)) in lines_with_spans(text).enumerate() {
        let line_no = line_no + 1;
        if line.trim().is_empty() {
            continue;
        }
        let open = line
            .find('[')
            .ok_or_else(|| CoreError::parse(line_no, "expected a time range after the word"))?;
        let word = line[..open].trim();
        if word.is_empty() {
            return Err(CoreError::parse(line_no, "missing word before time range"));
        }
        let mut cursor = Cursor::new(line, open);
        let (range, time_span) = parse_time_range(&mut cursor)
            .ok_or_else(|| CoreError::parse(line_no, "malformed time range"))?;
        cursor.skip_ws();
        let id = parse_id(&mut cursor)
            .ok_or_else(|| CoreError::parse(line_no, "malformed statement id"))?;
        if !cursor.at_end() {
            return Err(CoreError::parse(line_no, "trailing characters after id"));
        }
        nodes.push(LineNode {
            statement: Statement::new(word, range, id),
            span: line_start..line_end,
            time_span: line_start + time_span.start..line_start + time_span.end,
        });
    }
    Ok(nodes)
}

/// Parse and validate statement order. `Err(OrderViolation)` when the lines
/// parse but overlap in time or repeat ids.
pub fn collect(text: &str) -> Result<Vec<LineNode>> {
    let nodes = parse(text)?;
    let mut validator = OrderValidator::new(LineOrder::new());
    for node in &nodes {
        validator.add(node.statement.clone());
    }
    validator
        .finish()
        .map(|_| nodes)
        .ok_or(CoreError::OrderViolation)
}

/// Render a statement as a full transcript line, trailing newline included.
#[must_use]
pub fn format_line(statement: &Statement) -> String {
    format!(
        "{} {} [{}]\n",
        statement.word,
        format_time(statement.range),
        statement.id
    )
}

/// Render the embedded time token, brackets included.
#[must_use]
pub fn format_time(range: TimeRange) -> String {
    format!("[{}, {}]", range.start(), range.end())
}

fn parse_time_range(cursor: &mut Cursor<'_>) -> Option<(TimeRange, Range<usize>)> {
    let open = cursor.pos();
    if !cursor.eat(b'[') {
        return None;
    }
    cursor.skip_ws();
    let (start, _) = cursor.int()?;
    cursor.skip_ws();
    if !cursor.eat(b',') {
        return None;
    }
    cursor.skip_ws();
    let (end, _) = cursor.int()?;
    cursor.skip_ws();
    if !cursor.eat(b']') {
        return None;
    }
    Some((TimeRange::new(start, end), open..cursor.pos()))
}

fn parse_id(cursor: &mut Cursor<'_>) -> Option<i32> {
    if !cursor.eat(b'[') {
        return None;
    }
    cursor.skip_ws();
    let (id, _) = cursor.int()?;
    cursor.skip_ws();
    if !cursor.eat(b']') {
        return None;
    }
    i32::try_from(id).ok()
}
