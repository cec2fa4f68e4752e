//! Nested cue-script grammar.
//!
//! Block statements span an open and a close line, leaves a single line:
//!
//! ```text
//! intro { // 0, [1]
//!     greeting // 100, [2]
//! } // 500, [1]
//! ```
//!
//! Every time offset and id lives in a trailing `// <offset>, [<id>]` meta
//! comment. Nesting is brace-driven; the four-space indent is cosmetic and
//! reproduced by the formatter. The close line's id must repeat the open
//! line's id.

use core::ops::Range;

use crate::errors::{CoreError, Result};
use crate::order::{BlockOrder, OrderValidator};
use crate::parser::{lines_with_spans, Cursor};
use crate::statement::EnclosingStatement;
use crate::time::TimeRange;

/// Spaces per nesting level.
pub const INDENT: &str = "    ";

/// A parsed script statement with the byte spans the synchronizer edits.
///
/// `span` covers the whole construct: for a block, open line through close
/// line, children included. `head_end` sits just past the open line (where a
/// first child would be inserted), `tail_end` just past the whole construct
/// (where a following sibling would be inserted); for leaves the two
/// coincide. `start_time_span`/`end_time_span` cover only the offset digits
/// inside the meta comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    pub statement: EnclosingStatement,
    pub span: Range<usize>,
    pub start_time_span: Range<usize>,
    pub end_time_span: Option<Range<usize>>,
    pub head_end: usize,
    pub tail_end: usize,
}

struct OpenBlock {
    node: usize,
    id: i32,
    line_no: usize,
}

/// Parse script text into nodes, in document (open line) order. Lexical
/// only; see [`collect`] for the order-checked variant.
pub fn parse(text: &str) -> Result<Vec<BlockNode>> {
    let mut nodes: Vec<BlockNode> = Vec::new();
    let mut open: Vec<OpenBlock> = Vec::new();
    for (line_no, (line_start, line, line_end)) in lines_with_spans(text).enumerate() {
        let line_no = line_no + 1;
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('}') {
            let brace = line.len() - trimmed.len();
            let mut cursor = Cursor::new(line, brace + 1);
            let (end_ms, end_span, id) = parse_meta(&mut cursor)
                .ok_or_else(|| CoreError::parse(line_no, "malformed close line"))?;
            let block = open
                .pop()
                .ok_or_else(|| CoreError::parse(line_no, "unmatched '}'"))?;
            if block.id != id {
                return Err(CoreError::parse(
                    line_no,
                    format!("close id [{id}] does not match open id [{}]", block.id),
                ));
            }
            let node = &mut nodes[block.node];
            node.statement.range = TimeRange::new(node.statement.range.start(), end_ms);
            node.end_time_span = Some(line_start + end_span.start..line_start + end_span.end);
            node.span.end = line_end;
            node.tail_end = line_end;
            continue;
        }
        let meta = trimmed
            .find("//")
            .ok_or_else(|| CoreError::parse(line_no, "expected a '//' meta comment"))?;
        let head = trimmed[..meta].trim_end();
        let (word, is_block) = match head.strip_suffix('{') {
            Some(rest) => (rest.trim_end(), true),
            None => (head, false),
        };
        if word.is_empty() {
            return Err(CoreError::parse(line_no, "missing word before meta comment"));
        }
        let meta_pos = (line.len() - trimmed.len()) + meta;
        let mut cursor = Cursor::new(line, meta_pos);
        let (offset, offset_span, id) = parse_meta(&mut cursor)
            .ok_or_else(|| CoreError::parse(line_no, "malformed meta comment"))?;
        let depth = i32::try_from(open.len())
            .map_err(|_| CoreError::parse(line_no, "nesting too deep"))?;
        let node_index = nodes.len();
        nodes.push(BlockNode {
            statement: EnclosingStatement::new(
                word,
                TimeRange::new(offset, offset),
                id,
                depth,
                is_block,
            ),
            span: line_start..line_end,
            start_time_span: line_start + offset_span.start..line_start + offset_span.end,
            end_time_span: None,
            head_end: line_end,
            tail_end: line_end,
        });
        if is_block {
            open.push(OpenBlock {
                node: node_index,
                id,
                line_no,
            });
        }
    }
    if let Some(block) = open.pop() {
        return Err(CoreError::parse(
            block.line_no,
            format!("unclosed block [{}]", block.id),
        ));
    }
    Ok(nodes)
}

/// Parse and validate nesting order. `Err(OrderViolation)` when the text
/// parses but ids, sibling spans or containment are off.
pub fn collect(text: &str) -> Result<Vec<BlockNode>> {
    let nodes = parse(text)?;
    let mut validator = OrderValidator::new(BlockOrder::new());
    for node in &nodes {
        validator.add(node.statement.clone());
    }
    validator
        .finish()
        .map(|_| nodes)
        .ok_or(CoreError::OrderViolation)
}

/// Render a time offset the way the meta comments carry it.
#[must_use]
pub fn format_offset(ms: i64) -> String {
    ms.to_string()
}

/// Render a run of statements (document order) as script text. A block's
/// close line is emitted once the run steps back to its depth or shallower,
/// so siblings land after the closing brace, not inside it. Used to
/// materialize a batch of resurrected statements as one insertion.
#[must_use]
pub fn render_chain(statements: &[EnclosingStatement]) -> String {
    let mut out = String::new();
    let mut open: Vec<&EnclosingStatement> = Vec::new();
    for statement in statements {
        while open
            .last()
            .is_some_and(|block| block.depth >= statement.depth)
        {
            if let Some(block) = open.pop() {
                push_close_line(block, &mut out);
            }
        }
        let indent = indent_for(statement.depth);
        if statement.is_block {
            out.push_str(&format!(
                "{indent}{} {{ // {}, [{}]\n",
                statement.word,
                statement.range.start(),
                statement.id
            ));
            open.push(statement);
        } else {
            out.push_str(&format!(
                "{indent}{} // {}, [{}]\n",
                statement.word,
                statement.range.start(),
                statement.id
            ));
        }
    }
    while let Some(block) = open.pop() {
        push_close_line(block, &mut out);
    }
    out
}

fn indent_for(depth: i32) -> String {
    INDENT.repeat(usize::try_from(depth).unwrap_or(0))
}

fn push_close_line(block: &EnclosingStatement, out: &mut String) {
    let indent = indent_for(block.depth);
    out.push_str(&format!(
        "{indent}}} // {}, [{}]\n",
        block.range.end(),
        block.id
    ));
}

/// `// <offset>, [<id>]` with the offset's byte span within the line.
fn parse_meta(cursor: &mut Cursor<'_>) -> Option<(i64, Range<usize>, i32)> {
    cursor.skip_ws();
    if !cursor.eat(b'/') || !cursor.eat(b'/') {
        return None;
    }
    cursor.skip_ws();
    let (offset, span) = cursor.int()?;
    cursor.skip_ws();
    if !cursor.eat(b',') {
        return None;
    }
    cursor.skip_ws();
    if !cursor.eat(b'[') {
        return None;
    }
    cursor.skip_ws();
    let (id, _) = cursor.int()?;
    cursor.skip_ws();
    if !cursor.eat(b']') {
        return None;
    }
    if !cursor.at_end() {
        return None;
    }
    i32::try_from(id).ok().map(|id| (offset, span, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
intro { // 0, [1]
    greeting // 100, [2]
    body { // 200, [3]
        point // 250, [4]
    } // 400, [3]
} // 500, [1]
outro // 600, [5]
";

    #[test]
    fn parses_blocks_and_leaves_in_document_order() {
        let nodes = parse(SAMPLE).unwrap();
        let words: Vec<&str> = nodes.iter().map(|n| n.statement.word.as_str()).collect();
        assert_eq!(words, ["intro", "greeting", "body", "point", "outro"]);
        let intro = &nodes[0];
        assert_eq!(intro.statement.range, TimeRange::new(0, 500));
        assert_eq!(intro.statement.depth, 0);
        assert!(intro.statement.is_block);
        let point = &nodes[3];
        assert_eq!(point.statement.range, TimeRange::new(250, 250));
        assert_eq!(point.statement.depth, 2);
        assert!(!point.statement.is_block);
    }

    #[test]
    fn block_spans_cover_open_through_close() {
        let nodes = parse(SAMPLE).unwrap();
        let intro = &nodes[0];
        assert_eq!(&SAMPLE[intro.span.clone()], &SAMPLE[..124]);
        assert_eq!(intro.head_end, 18);
        assert_eq!(intro.tail_end, 124);
        let body = &nodes[2];
        assert!(SAMPLE[body.span.clone()].starts_with("    body {"));
        assert!(SAMPLE[body.span.clone()].ends_with("} // 400, [3]\n"));
    }

    #[test]
    fn time_spans_cover_only_the_offset_digits() {
        let nodes = parse(SAMPLE).unwrap();
        let intro = &nodes[0];
        assert_eq!(&SAMPLE[intro.start_time_span.clone()], "0");
        assert_eq!(&SAMPLE[intro.end_time_span.clone().unwrap()], "500");
        let greeting = &nodes[1];
        assert_eq!(&SAMPLE[greeting.start_time_span.clone()], "100");
        assert_eq!(greeting.end_time_span, None);
    }

    #[test]
    fn leaf_insert_anchors_coincide() {
        let nodes = parse(SAMPLE).unwrap();
        let outro = &nodes[4];
        assert_eq!(outro.head_end, outro.tail_end);
        assert_eq!(outro.tail_end, outro.span.end);
    }

    #[test]
    fn mismatched_close_id_is_a_parse_error() {
        let text = "a { // 0, [1]\n} // 10, [2]\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, CoreError::Parse { line: 2, .. }));
    }

    #[test]
    fn unclosed_block_reports_the_open_line() {
        let text = "a { // 0, [1]\n    b // 5, [2]\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, CoreError::Parse { line: 1, .. }));
    }

    #[test]
    fn unmatched_close_is_a_parse_error() {
        let err = parse("} // 10, [1]\n").unwrap_err();
        assert!(matches!(err, CoreError::Parse { line: 1, .. }));
    }

    #[test]
    fn collect_accepts_the_sample() {
        assert_eq!(collect(SAMPLE).unwrap().len(), 5);
    }

    #[test]
    fn collect_rejects_a_child_outside_its_parent() {
        let text = "a { // 0, [1]\n    b // 700, [2]\n} // 500, [1]\n";
        assert_eq!(collect(text).unwrap_err(), CoreError::OrderViolation);
    }

    #[test]
    fn render_chain_closes_nested_blocks_before_siblings() {
        let chain = vec![
            EnclosingStatement::new("outer", TimeRange::new(0, 500), 1, 0, true),
            EnclosingStatement::new("inner", TimeRange::new(50, 200), 2, 1, true),
            EnclosingStatement::new("point", TimeRange::new(100, 100), 3, 2, false),
            EnclosingStatement::new("tail", TimeRange::new(250, 250), 4, 1, false),
        ];
        let text = render_chain(&chain);
        assert_eq!(
            text,
            "outer { // 0, [1]\n    inner { // 50, [2]\n        point // 100, [3]\n    } // 200, [2]\n    tail // 250, [4]\n} // 500, [1]\n"
        );
        // The sibling sits outside inner's braces; nesting still validates.
        assert_eq!(collect(&text).unwrap().len(), 4);
    }

    #[test]
    fn render_chain_round_trips_through_parse() {
        let chain = vec![
            EnclosingStatement::new("scene", TimeRange::new(0, 500), 1, 0, true),
            EnclosingStatement::new("line", TimeRange::new(100, 100), 2, 1, false),
        ];
        let text = render_chain(&chain);
        assert_eq!(text, "scene { // 0, [1]\n    line // 100, [2]\n} // 500, [1]\n");
        let nodes = parse(&text).unwrap();
        assert_eq!(nodes[0].statement, chain[0]);
        assert_eq!(nodes[1].statement, chain[1]);
    }
}
