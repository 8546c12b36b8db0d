//! Type constraints for hot properties and typed containers.
//!
//! # Responsibility
//! - Decide whether a candidate `Value` may enter a slot or container.
//!
//! # Invariants
//! - The accepted leaf kinds are fixed when a guard is built; there is no
//!   process-wide registry of "immutable" types.
//! - Tuples, frozen sets and records are checked recursively down to leaves.

use crate::error::{HotError, HotResult};
use crate::model::value::{LeafKind, RecordShape, Value};
use bitflags::bitflags;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const LEAF_KIND_ORDER: [LeafKind; 8] = [
    LeafKind::Bool,
    LeafKind::Int,
    LeafKind::Float,
    LeafKind::Str,
    LeafKind::Date,
    LeafKind::Time,
    LeafKind::DateTime,
    LeafKind::Duration,
];

bitflags! {
    /// Set of leaf kinds a guard accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LeafKinds: u16 {
        const BOOL = 1 << 0;
        const INT = 1 << 1;
        const FLOAT = 1 << 2;
        const STR = 1 << 3;
        const DATE = 1 << 4;
        const TIME = 1 << 5;
        const DATETIME = 1 << 6;
        const DURATION = 1 << 7;
        const NUMBERS = Self::INT.bits() | Self::FLOAT.bits();
        const TEMPORAL = Self::DATE.bits()
            | Self::TIME.bits()
            | Self::DATETIME.bits()
            | Self::DURATION.bits();
    }
}

impl LeafKinds {
    pub fn of(kind: LeafKind) -> Self {
        match kind {
            LeafKind::Bool => Self::BOOL,
            LeafKind::Int => Self::INT,
            LeafKind::Float => Self::FLOAT,
            LeafKind::Str => Self::STR,
            LeafKind::Date => Self::DATE,
            LeafKind::Time => Self::TIME,
            LeafKind::DateTime => Self::DATETIME,
            LeafKind::Duration => Self::DURATION,
        }
    }

    pub fn accepts(self, kind: LeafKind) -> bool {
        self.contains(Self::of(kind))
    }
}

impl Default for LeafKinds {
    fn default() -> Self {
        Self::all()
    }
}

impl Display for LeafKinds {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = LEAF_KIND_ORDER
            .iter()
            .filter(|kind| self.accepts(**kind))
            .map(|kind| kind.as_str())
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Shape a value must have to enter a constrained slot.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeConstraint {
    /// Any immutable value.
    Any,
    Leaf(LeafKind),
    Tuple,
    FrozenSet,
    Record(Arc<RecordShape>),
}

impl Display for TypeConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "immutable value"),
            Self::Leaf(kind) => write!(f, "{}", kind.as_str()),
            Self::Tuple => write!(f, "tuple"),
            Self::FrozenSet => write!(f, "frozenset"),
            Self::Record(shape) => write!(f, "record `{}`", shape.name()),
        }
    }
}

impl From<LeafKind> for TypeConstraint {
    fn from(value: LeafKind) -> Self {
        Self::Leaf(value)
    }
}

impl From<Arc<RecordShape>> for TypeConstraint {
    fn from(value: Arc<RecordShape>) -> Self {
        Self::Record(value)
    }
}

/// Constraint plus accepted leaf kinds, checked before any state change.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueGuard {
    constraint: TypeConstraint,
    leaves: LeafKinds,
}

impl ValueGuard {
    pub fn new(constraint: TypeConstraint, leaves: LeafKinds) -> Self {
        Self { constraint, leaves }
    }

    /// Accepts any immutable value built from any leaf kind.
    pub fn untyped() -> Self {
        Self::new(TypeConstraint::Any, LeafKinds::all())
    }

    pub fn typed(constraint: impl Into<TypeConstraint>) -> Self {
        Self::new(constraint.into(), LeafKinds::all())
    }

    pub fn constraint(&self) -> &TypeConstraint {
        &self.constraint
    }

    pub fn leaves(&self) -> LeafKinds {
        self.leaves
    }

    /// Validates one candidate value.
    ///
    /// # Errors
    /// - `TypeMismatch` when the outer shape does not match the constraint or
    ///   any nested leaf is outside the accepted leaf kinds.
    pub fn check(&self, value: &Value) -> HotResult<()> {
        let shape_ok = match (&self.constraint, value) {
            (TypeConstraint::Any, _) => true,
            (TypeConstraint::Leaf(kind), candidate) => candidate.leaf_kind() == Some(*kind),
            (TypeConstraint::Tuple, Value::Tuple(_)) => true,
            (TypeConstraint::FrozenSet, Value::FrozenSet(_)) => true,
            (TypeConstraint::Record(shape), Value::Record(record)) => {
                Arc::ptr_eq(shape, record.shape()) || **shape == **record.shape()
            }
            _ => false,
        };
        if !shape_ok {
            return Err(HotError::mismatch(
                self.constraint.to_string(),
                value.type_name(),
            ));
        }
        self.check_members(value)
    }

    /// Validates every slice member before a bulk write.
    pub fn check_all<'a>(&self, values: impl IntoIterator<Item = &'a Value>) -> HotResult<()> {
        values.into_iter().try_for_each(|value| self.check(value))
    }

    fn check_members(&self, value: &Value) -> HotResult<()> {
        match value {
            Value::Tuple(items) => items.iter().try_for_each(|item| self.check_members(item)),
            Value::FrozenSet(set) => set.iter().try_for_each(|item| self.check_members(item)),
            Value::Record(record) => record
                .values()
                .iter()
                .try_for_each(|item| self.check_members(item)),
            leaf => match leaf.leaf_kind() {
                Some(kind) if self.leaves.accepts(kind) => Ok(()),
                _ => Err(HotError::mismatch(
                    format!("one of {}", self.leaves),
                    leaf.type_name(),
                )),
            },
        }
    }
}

impl Default for ValueGuard {
    fn default() -> Self {
        Self::untyped()
    }
}

#[cfg(test)]
mod tests {
    use super::{LeafKinds, TypeConstraint, ValueGuard};
    use crate::error::HotError;
    use crate::model::value::{LeafKind, RecordShape, Value};

    #[test]
    fn untyped_guard_accepts_nested_immutables() {
        let guard = ValueGuard::untyped();
        guard.check(&Value::from(1)).expect("int accepted");
        guard
            .check(&Value::tuple([Value::from("a"), Value::frozen_set([1, 2])]))
            .expect("nested tuple accepted");
    }

    #[test]
    fn leaf_guard_rejects_other_kinds() {
        let guard = ValueGuard::typed(LeafKind::Int);
        guard.check(&Value::from(7)).expect("int accepted");
        let err = guard
            .check(&Value::from("7"))
            .expect_err("str must be rejected");
        assert!(matches!(err, HotError::TypeMismatch { .. }));
    }

    #[test]
    fn restricted_leaf_set_applies_inside_tuples() {
        let guard = ValueGuard::new(TypeConstraint::Tuple, LeafKinds::NUMBERS);
        guard
            .check(&Value::tuple([Value::from(1), Value::from(2.0)]))
            .expect("numbers accepted");
        let err = guard
            .check(&Value::tuple([Value::from(1), Value::from("x")]))
            .expect_err("str member must be rejected");
        assert!(err.to_string().contains("int|float"));
    }

    #[test]
    fn record_guard_requires_matching_shape() {
        let pair = RecordShape::new("Pair", ["left", "right"]);
        let other = RecordShape::new("Other", ["left", "right"]);
        let guard = ValueGuard::typed(pair.clone());

        guard
            .check(&Value::from(pair.record([1, 2]).unwrap()))
            .expect("matching record accepted");
        assert!(guard
            .check(&Value::from(other.record([1, 2]).unwrap()))
            .is_err());
        assert!(guard.check(&Value::tuple([1, 2])).is_err());
    }

    #[test]
    fn leaf_kinds_display_lists_members_in_order() {
        assert_eq!(LeafKinds::TEMPORAL.to_string(), "date|time|datetime|duration");
        assert!(LeafKinds::default().accepts(LeafKind::Bool));
    }
}
