//! Value model shared by every hot node.
//!
//! # Responsibility
//! - Define the immutable values that hot properties and containers hold.
//! - Define the constraints that decide which values a slot accepts.
//!
//! # Invariants
//! - Values never alias mutable state; replacing a value is the only way to
//!   change what a slot holds.

pub mod constraint;
pub mod value;
