//! Streaming validation of statement order while collecting a parse.
//!
//! The grammars guarantee syntax, not sense: statements must also appear in
//! increasing id order with non-overlapping, properly nested time ranges.
//! An [`OrderValidator`] is fed statements in document order; the first rule
//! violation permanently poisons the run, and [`OrderValidator::finish`]
//! yields either the complete accepted sequence or nothing. There is no
//! partial result.

use crate::statement::{EnclosingStatement, Statement, TimedStatement};

/// An ordering rule checked statement by statement.
///
/// `check` may keep state between calls (the nested rule keeps a stack of
/// open blocks). Once it returns `false` the driver never calls it again.
pub trait OrderRule<S> {
    fn check(&mut self, statement: &S) -> bool;
}

/// Drives an [`OrderRule`] over a statement stream with poisoned-run
/// semantics.
#[derive(Debug)]
pub struct OrderValidator<S, R> {
    rule: R,
    accepted: Vec<S>,
    valid: bool,
}

impl<S, R: OrderRule<S>> OrderValidator<S, R> {
    #[must_use]
    pub fn new(rule: R) -> Self {
        Self {
            rule,
            accepted: Vec::new(),
            valid: true,
        }
    }

    /// Feed the next statement in document order. Returns whether it was
    /// accepted; after the first rejection every call returns `false`.
    pub fn add(&mut self, statement: S) -> bool {
        if !self.valid {
            return false;
        }
        if self.rule.check(&statement) {
            self.accepted.push(statement);
            true
        } else {
            self.valid = false;
            false
        }
    }

    /// The accepted sequence, or `None` if any statement was rejected.
    #[must_use]
    pub fn finish(self) -> Option<Vec<S>> {
        self.valid.then_some(self.accepted)
    }
}

/// Flat transcript order: valid range, no time overlap with the previous
/// statement, strictly increasing ids.
#[derive(Debug, Default)]
pub struct LineOrder {
    last: Option<(i64, i32)>,
}

impl LineOrder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderRule<Statement> for LineOrder {
    fn check(&mut self, statement: &Statement) -> bool {
        if !statement.range().is_valid() {
            return false;
        }
        if let Some((last_end, last_id)) = self.last {
            if last_end > statement.range().start() || statement.id() <= last_id {
                return false;
            }
        }
        self.last = Some((statement.range().end(), statement.id()));
        true
    }
}

/// Nested cue-script order: increasing ids, siblings non-overlapping in
/// document order, children contained in their parent's range.
///
/// Keeps a stack of the enclosing statements still open at the current
/// position. Depths must grow by arbitrary steps downward but close in
/// stack order.
#[derive(Debug, Default)]
pub struct BlockOrder {
    open: Vec<EnclosingStatement>,
}

impl BlockOrder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderRule<EnclosingStatement> for BlockOrder {
    fn check(&mut self, statement: &EnclosingStatement) -> bool {
        if !statement.range().is_valid() {
            return false;
        }
        let Some(mut last) = self.open.pop() else {
            self.open.push(statement.clone());
            return true;
        };
        // Close every block deeper than the incoming statement.
        while last.depth > statement.depth {
            match self.open.pop() {
                Some(shallower) => last = shallower,
                None => break,
            }
        }
        if last.id() >= statement.id() {
            return false;
        }
        if statement.depth == last.depth {
            // Sibling: the previous block is closed, but every still-open
            // ancestor must contain the newcomer.
            if last.range().end() > statement.range().start() {
                return false;
            }
            if let Some(parent) = self.open.last() {
                if !parent.range().contains(&statement.range()) {
                    return false;
                }
            }
        } else {
            // Child: the enclosing block stays open and must contain it.
            if !last.range().contains(&statement.range()) {
                return false;
            }
            self.open.push(last);
        }
        self.open.push(statement.clone());
        true
    }
}
