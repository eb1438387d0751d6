//! Gemini integration: model discovery and narration script generation.
//!
//! The listing endpoint is queried on every run so the pipeline keeps working as
//! model names change. Generation requests are retried only while the provider
//! reports overload.

mod client;
mod models;
mod retry;
mod script;

pub use client::{GeminiClient, GeminiError, GEMINI_API_BASE_URL, GENERATE_CONTENT_METHOD};
pub use models::{select_model, FallbackReason, ModelChoice, ModelDescriptor, ModelResolver};
pub use retry::{is_overloaded, linear_backoff, DEFAULT_BACKOFF_STEP, DEFAULT_MAX_ATTEMPTS};
pub use script::{act_boundaries, build_prompt, parse_reply, GenerationResult, ScriptGenerator};
