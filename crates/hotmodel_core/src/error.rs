//! Engine error contract.
//!
//! # Responsibility
//! - Describe every failure a declaring or mutating call can report.
//!
//! # Invariants
//! - Errors are returned to the caller that attempted the operation and the
//!   target node is left unchanged.
//! - Listener failures never surface here; they go to the diagnostic sink.

use crate::model::value::DictKey;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by all declaring/mutating node operations.
pub type HotResult<T> = Result<T, HotError>;

/// Errors from hot node declaration and mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum HotError {
    /// Value does not satisfy the declared type or container constraint.
    TypeMismatch { expected: String, found: String },
    /// `None` assigned to a property declared with `allow_none = false`.
    NullNotAllowed(String),
    /// Hot property declared twice under the same name.
    DuplicateDeclaration(String),
    /// Attempt to rebind a node-typed property instead of copying into it.
    ImmutableSlot(String),
    /// Structural misuse of the node tree.
    PrecondViolation(String),
    /// Deletion of an absent mapping key.
    KeyNotFound(DictKey),
    /// Sequence index outside the current bounds after natural resolution.
    IndexOutOfRange { index: isize, len: usize },
    /// Read of a name that is neither a hot property nor a plain attribute.
    UnknownProperty(String),
}

impl HotError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::PrecondViolation(message.into())
    }
}

impl Display for HotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
            Self::NullNotAllowed(name) => write!(f, "none is not allowed for `{name}`"),
            Self::DuplicateDeclaration(name) => {
                write!(f, "hot property already declared: `{name}`")
            }
            Self::ImmutableSlot(name) => write!(
                f,
                "node property `{name}` cannot be rebound; copy into it instead"
            ),
            Self::PrecondViolation(message) => write!(f, "precondition violated: {message}"),
            Self::KeyNotFound(key) => write!(f, "key not found: {key}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Self::UnknownProperty(name) => write!(f, "unknown property: `{name}`"),
        }
    }
}

impl Error for HotError {}

#[cfg(test)]
mod tests {
    use super::HotError;
    use crate::model::value::DictKey;

    #[test]
    fn display_names_the_offending_item() {
        let err = HotError::KeyNotFound(DictKey::from("missing"));
        assert!(err.to_string().contains("missing"));

        let err = HotError::IndexOutOfRange { index: -6, len: 5 };
        assert_eq!(err.to_string(), "index -6 out of range for length 5");

        let err = HotError::mismatch("int", "str");
        assert!(matches!(err, HotError::TypeMismatch { .. }));
        assert!(err.to_string().contains("expected int"));
    }
}
