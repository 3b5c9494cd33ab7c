//! Text normalization for scraped case content
//!
//! Page text arrives with its block structure flattened: headers are glued to
//! the paragraph that follows them and sentences run into each other. This
//! module restores line breaks with a fixed sequence of rewrite rules and
//! carves labelled spans out of the page text.

mod segmenter;

pub use segmenter::{extract_span, parse_synopsis, segment, SYNOPSIS_END_MARKER, SYNOPSIS_START_MARKER};
