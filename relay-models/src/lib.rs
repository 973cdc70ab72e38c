//! Model management for relay.
//!
//! This crate provides:
//! - The merged model catalog (curated list + keyword-filtered dynamic
//!   entries)
//! - A TTL-cached OpenRouter model-list provider
//! - Credential resolution with environment fallback
//! - Keyword-heuristic model recommendation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                   catalog                     │
//! │   curated list  ◄── merge ──  remote list     │
//! │                               (TTL cache)     │
//! └──────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌──────────────────────────────────────────────┐
//! │            recommend (keyword scorer)         │
//! └──────────────────────────────────────────────┘
//! ```

mod error;
mod types;

pub mod auth;
pub mod catalog;
pub mod providers;
pub mod recommend;

pub use error::{Error, Result};
pub use types::ModelEntry;
