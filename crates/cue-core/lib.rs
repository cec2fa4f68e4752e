//! # cue-core
//!
//! Core model for time-coded transcript and cue-script synchronization:
//! deleting a span of recorded time in one artifact must move every sibling
//! artifact's displayed timestamps the same way. The model is deliberately
//! free of I/O and host-editor concerns; `cue-editor` layers documents,
//! polling and undo on top.
//!
//! ## Modules
//!
//! - [`time`] — [`TimeRange`], closed millisecond intervals.
//! - [`timeline`] — [`Timeline`], the deleted-time set with coordinate
//!   projection via [`Timeline::impose`].
//! - [`statement`] — flat and nested time-stamped statement records.
//! - [`order`] — streaming validation of statement order and nesting.
//! - [`edit`] — batched text edits with positional bookkeeping.
//! - [`parser`] — the two reference grammars and their formatters.
//!
//! ## Example
//!
//! ```
//! use cue_core::{TimeRange, Timeline};
//!
//! let mut timeline = Timeline::new();
//! timeline.delete(TimeRange::new(0, 99));
//! // A statement recorded at [150, 250] now plays at [50, 150].
//! assert_eq!(timeline.impose(TimeRange::new(150, 250)), TimeRange::new(50, 150));
//! // A statement entirely inside deleted time projects to an invalid range.
//! assert!(!timeline.impose(TimeRange::new(20, 80)).is_valid());
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod edit;
pub mod errors;
pub mod order;
pub mod parser;
pub mod statement;
pub mod time;
pub mod timeline;

pub use edit::{Edit, EditScript, EditSink};
pub use errors::{CoreError, Result};
pub use order::{BlockOrder, LineOrder, OrderRule, OrderValidator};
pub use statement::{EnclosingStatement, Statement, TimedStatement};
pub use time::TimeRange;
pub use timeline::Timeline;
