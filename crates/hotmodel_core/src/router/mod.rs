//! Event routing from one tree listener to many per-path handlers.
//!
//! # Responsibility
//! - Select handlers by `(fqname, event kind)` with wildcard fallbacks.
//! - Adapt view objects with one method per event kind.

pub mod mapper;
pub mod view;
