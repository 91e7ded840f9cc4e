//! Helodesk backend library.
//!
//! Core components for the chat widget backend: reply resolution, the
//! append-only exchange log with its two storage backends, and the live
//! admin feed.

pub mod api;
pub mod record;
pub mod resolver;
pub mod secrets;
pub mod stream;
