//! # Library Model Module
//!
//! Owns the canonical reading-library records shared by the decoders, the
//! reconciliation engine, and downstream note writers.
//!
//! ## Overview
//!
//! - [`Highlight`](models::Highlight) and [`HighlightColor`](models::HighlightColor)
//! - [`ReadingPosition`](models::ReadingPosition) with its supersede rule
//! - [`ReadingStats`](models::ReadingStats) supplied by the backup reader
//! - [`BookRecord`](models::BookRecord), one per resolved book identity

pub mod models;

pub use models::{
    sort_highlights, BookRecord, Highlight, HighlightColor, ReadingPosition, ReadingStats,
};
