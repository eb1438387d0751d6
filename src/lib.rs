//! reelsmith library crate.
//!
//! Topic to short vertical video: script generation, stock footage, narration
//! and captioned rendering, driven by a spreadsheet job queue.

pub mod cli;
pub mod compose;
pub mod config;
pub mod footage;
pub mod gemini;
pub mod job;
pub mod narration;
pub mod queue;
