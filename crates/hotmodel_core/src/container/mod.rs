//! Hot containers: objects, lists and dicts.
//!
//! Every container is a cheap-to-clone handle around shared state plus a
//! `NodeCore`. Mutations validate first, then change state, then fire.

pub mod dict;
pub mod list;
pub mod object;
