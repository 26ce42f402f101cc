//! Reading state: the lazy line reader and the bounded position history that
//! makes backward navigation cheap.
//!
//! The reader owns the flattened document and a single char offset. Display
//! lines are never materialized; each `advance`/`retreat` call measures only
//! the text it needs for the width the host passes in.

pub mod history;
pub mod reader;

pub use history::{POSITION_HISTORY_MAX, PositionHistory};
pub use reader::{LineReader, NavOutcome, RETREAT_SAMPLE_CHARS, ReaderConfig, TAIL_SAMPLE_CHARS};
