//! Stock footage retrieval.
//!
//! Keywords written by the model are noisy, so they are sanitized before search,
//! and a failed search falls back to a generic term and finally a fixed asset.
//! Composition is never blocked by sourcing.

mod client;
mod locator;

pub use client::{
    FootageError, PexelsClient, StockVideo, VideoFile, PEXELS_API_BASE_URL, PORTRAIT_ORIENTATION,
};
pub use locator::{select_widest, sanitize_keyword, FootageAsset, FootageLocator, FootageOrigin};
