//! Observable sequence node.
//!
//! # Invariants
//! - Every element satisfies the list's `ValueGuard`; validation happens
//!   before any element is touched.
//! - Event keys carry natural (non-negative) indexes or resolved slices.
//! - Construction fires one `Reset` with key `None`.

use crate::config::HotConfig;
use crate::error::{HotError, HotResult};
use crate::model::constraint::{TypeConstraint, ValueGuard};
use crate::model::value::Value;
use crate::node::event::{EventKey, EventKind};
use crate::node::listener::fire;
use crate::node::{HotNode, NodeCore, NodeRef};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::ops::{Bound, Range, RangeBounds};
use std::rc::Rc;

struct ListState {
    guard: ValueGuard,
    items: Vec<Value>,
}

/// Ordered hot sequence of immutable values.
///
/// Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct HotList {
    core: Rc<NodeCore>,
    state: Rc<RefCell<ListState>>,
}

impl HotList {
    /// Creates an empty, untyped list.
    pub fn new() -> Self {
        Self::build(ValueGuard::untyped(), Vec::new(), HotConfig::default())
    }

    /// Creates an untyped list holding `items`.
    pub fn with_items(items: impl IntoIterator<Item = Value>) -> HotResult<Self> {
        Self::with_guard(ValueGuard::untyped(), items)
    }

    /// Creates an empty list whose elements must satisfy `constraint`.
    pub fn typed(constraint: impl Into<TypeConstraint>) -> Self {
        Self::build(
            ValueGuard::typed(constraint),
            Vec::new(),
            HotConfig::default(),
        )
    }

    pub fn typed_with_items(
        constraint: impl Into<TypeConstraint>,
        items: impl IntoIterator<Item = Value>,
    ) -> HotResult<Self> {
        Self::with_guard(ValueGuard::typed(constraint), items)
    }

    pub fn with_guard(guard: ValueGuard, items: impl IntoIterator<Item = Value>) -> HotResult<Self> {
        Self::with_config(guard, items, HotConfig::default())
    }

    /// Creates a list with an explicit guard and tree configuration.
    ///
    /// # Errors
    /// - `TypeMismatch` when any initial item violates `guard`.
    pub fn with_config(
        guard: ValueGuard,
        items: impl IntoIterator<Item = Value>,
        config: HotConfig,
    ) -> HotResult<Self> {
        let items: Vec<Value> = items.into_iter().collect();
        guard.check_all(&items)?;
        Ok(Self::build(guard, items, config))
    }

    fn build(guard: ValueGuard, items: Vec<Value>, config: HotConfig) -> Self {
        let list = Self {
            core: NodeCore::new_root(config),
            state: Rc::new(RefCell::new(ListState { guard, items })),
        };
        fire(&list, EventKind::Reset, EventKey::None);
        list
    }

    pub fn guard(&self) -> ValueGuard {
        self.state.borrow().guard.clone()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().items.is_empty()
    }

    /// Reads one element; negative indexes count from the end.
    pub fn get(&self, index: isize) -> HotResult<Value> {
        let state = self.state.borrow();
        let natural = resolve_index(index, state.items.len())?;
        Ok(state.items[natural].clone())
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.state.borrow().items.contains(value)
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.state.borrow().items.clone()
    }

    /// Iterates over a snapshot taken at call time.
    pub fn iter(&self) -> std::vec::IntoIter<Value> {
        self.to_vec().into_iter()
    }

    /// Runs `f` against the current elements without cloning them.
    ///
    /// `f` must not mutate this list.
    pub fn read<R>(&self, f: impl FnOnce(&[Value]) -> R) -> R {
        f(&self.state.borrow().items)
    }

    /// Replaces one element and fires `Update` at its natural index.
    ///
    /// # Errors
    /// - `TypeMismatch` when `value` violates the guard.
    /// - `IndexOutOfRange` when `index` does not resolve to an element.
    pub fn set(&self, index: isize, value: impl Into<Value>) -> HotResult<()> {
        let value = value.into();
        let natural = {
            let mut state = self.state.borrow_mut();
            state.guard.check(&value)?;
            let natural = resolve_index(index, state.items.len())?;
            state.items[natural] = value;
            natural
        };
        fire(self, EventKind::Update, EventKey::Index(natural));
        Ok(())
    }

    /// Replaces a slice and fires `Reset` keyed by the resolved bounds.
    ///
    /// Bounds are clamped to the current length.
    pub fn set_slice(
        &self,
        range: impl RangeBounds<usize>,
        values: impl IntoIterator<Item = Value>,
    ) -> HotResult<()> {
        let values: Vec<Value> = values.into_iter().collect();
        let resolved = {
            let mut state = self.state.borrow_mut();
            state.guard.check_all(&values)?;
            let resolved = resolve_slice(&range, state.items.len());
            state.items.splice(resolved.clone(), values);
            resolved
        };
        fire(self, EventKind::Reset, EventKey::Slice(resolved));
        Ok(())
    }

    /// Inserts before `index` and fires `Insert` at the new element's position.
    ///
    /// Negative indexes resolve against the length before insertion, so
    /// `-1` inserts in front of the current last element.
    ///
    /// # Errors
    /// - `TypeMismatch` when `value` violates the guard.
    /// - `IndexOutOfRange` when `index` resolves outside `0..=len`.
    pub fn insert(&self, index: isize, value: impl Into<Value>) -> HotResult<()> {
        let value = value.into();
        let natural = {
            let mut state = self.state.borrow_mut();
            state.guard.check(&value)?;
            let natural = resolve_insert_index(index, state.items.len())?;
            state.items.insert(natural, value);
            natural
        };
        fire(self, EventKind::Insert, EventKey::Index(natural));
        Ok(())
    }

    /// Appends one element and fires `Insert` at `len - 1`.
    pub fn append(&self, value: impl Into<Value>) -> HotResult<()> {
        let value = value.into();
        let natural = {
            let mut state = self.state.borrow_mut();
            state.guard.check(&value)?;
            state.items.push(value);
            state.items.len() - 1
        };
        fire(self, EventKind::Insert, EventKey::Index(natural));
        Ok(())
    }

    /// Removes one element and fires `Delete` at its natural index.
    pub fn delete(&self, index: isize) -> HotResult<Value> {
        let (natural, removed) = {
            let mut state = self.state.borrow_mut();
            let natural = resolve_index(index, state.items.len())?;
            (natural, state.items.remove(natural))
        };
        fire(self, EventKind::Delete, EventKey::Index(natural));
        Ok(removed)
    }

    /// Removes a clamped slice and fires `Reset` keyed by the resolved bounds.
    pub fn delete_slice(&self, range: impl RangeBounds<usize>) -> Vec<Value> {
        let (resolved, removed) = {
            let mut state = self.state.borrow_mut();
            let resolved = resolve_slice(&range, state.items.len());
            let removed: Vec<Value> = state.items.drain(resolved.clone()).collect();
            (resolved, removed)
        };
        fire(self, EventKind::Reset, EventKey::Slice(resolved));
        removed
    }

    /// Appends every item, firing one `Insert` per element.
    ///
    /// All items are validated before the first one is appended.
    pub fn extend(&self, items: impl IntoIterator<Item = Value>) -> HotResult<()> {
        let items: Vec<Value> = items.into_iter().collect();
        self.state.borrow().guard.check_all(&items)?;
        for item in items {
            let natural = {
                let mut state = self.state.borrow_mut();
                state.items.push(item);
                state.items.len() - 1
            };
            fire(self, EventKind::Insert, EventKey::Index(natural));
        }
        Ok(())
    }

    /// Replaces the whole contents and fires one `Reset` with key `None`.
    pub fn copy_in(&self, items: impl IntoIterator<Item = Value>) -> HotResult<()> {
        let items: Vec<Value> = items.into_iter().collect();
        self.state.borrow().guard.check_all(&items)?;
        self.replace_all(items);
        Ok(())
    }

    pub(crate) fn replace_all(&self, items: Vec<Value>) {
        self.state.borrow_mut().items = items;
        fire(self, EventKind::Reset, EventKey::None);
    }
}

impl Default for HotList {
    fn default() -> Self {
        Self::new()
    }
}

impl HotNode for HotList {
    fn core(&self) -> &Rc<NodeCore> {
        &self.core
    }

    fn node_ref(&self) -> NodeRef {
        NodeRef::List(self.clone())
    }
}

impl Debug for HotList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotList")
            .field("fqname", &self.fqname())
            .field("items", &self.state.borrow().items)
            .finish()
    }
}

fn resolve_index(index: isize, len: usize) -> HotResult<usize> {
    let resolved = if index < 0 { len as isize + index } else { index };
    if resolved < 0 || resolved as usize >= len {
        return Err(HotError::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

fn resolve_insert_index(index: isize, len: usize) -> HotResult<usize> {
    let resolved = if index < 0 { len as isize + index } else { index };
    if resolved < 0 || resolved as usize > len {
        return Err(HotError::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

fn resolve_slice(range: &impl RangeBounds<usize>, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(start) => *start,
        Bound::Excluded(start) => start.saturating_add(1),
        Bound::Unbounded => 0,
    }
    .min(len);
    let end = match range.end_bound() {
        Bound::Included(end) => end.saturating_add(1),
        Bound::Excluded(end) => *end,
        Bound::Unbounded => len,
    }
    .min(len);
    start..end.max(start)
}
