//! SAME (Specific Area Message Encoding) header grammar, message model, and
//! the confidence-averaging reconstruction decoder.

mod confidence;
mod header;

pub use confidence::{average_message, CONFIDENCE_MAX};
pub use header::{originator_codes, EventCategory, SameMessage, ORIGINATOR_WIDTH};
