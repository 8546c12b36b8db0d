//! Observable mapping node keyed by `DictKey`.
//!
//! Keys iterate in `DictKey` order. Construction does not fire.

use crate::config::HotConfig;
use crate::error::{HotError, HotResult};
use crate::model::constraint::{TypeConstraint, ValueGuard};
use crate::model::value::{DictKey, Value};
use crate::node::event::{EventKey, EventKind};
use crate::node::listener::fire;
use crate::node::{HotNode, NodeCore, NodeRef};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

struct DictState {
    guard: ValueGuard,
    entries: BTreeMap<DictKey, Value>,
}

/// Hot mapping from `DictKey` to immutable values.
///
/// Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct HotDict {
    core: Rc<NodeCore>,
    state: Rc<RefCell<DictState>>,
}

impl HotDict {
    pub fn new() -> Self {
        Self::build(ValueGuard::untyped(), BTreeMap::new(), HotConfig::default())
    }

    /// Creates an empty dict whose values must satisfy `constraint`.
    pub fn typed(constraint: impl Into<TypeConstraint>) -> Self {
        Self::build(
            ValueGuard::typed(constraint),
            BTreeMap::new(),
            HotConfig::default(),
        )
    }

    pub fn with_entries<I, K, V>(entries: I) -> HotResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<DictKey>,
        V: Into<Value>,
    {
        Self::with_config(ValueGuard::untyped(), entries, HotConfig::default())
    }

    /// Creates a dict with an explicit guard and tree configuration.
    ///
    /// # Errors
    /// - `TypeMismatch` when any initial value violates `guard`.
    pub fn with_config<I, K, V>(guard: ValueGuard, entries: I, config: HotConfig) -> HotResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<DictKey>,
        V: Into<Value>,
    {
        let entries: BTreeMap<DictKey, Value> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        guard.check_all(entries.values())?;
        Ok(Self::build(guard, entries, config))
    }

    fn build(guard: ValueGuard, entries: BTreeMap<DictKey, Value>, config: HotConfig) -> Self {
        Self {
            core: NodeCore::new_root(config),
            state: Rc::new(RefCell::new(DictState { guard, entries })),
        }
    }

    pub fn guard(&self) -> ValueGuard {
        self.state.borrow().guard.clone()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    pub fn get(&self, key: impl Into<DictKey>) -> Option<Value> {
        self.state.borrow().entries.get(&key.into()).cloned()
    }

    pub fn contains_key(&self, key: impl Into<DictKey>) -> bool {
        self.state.borrow().entries.contains_key(&key.into())
    }

    pub fn keys(&self) -> Vec<DictKey> {
        self.state.borrow().entries.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.state.borrow().entries.values().cloned().collect()
    }

    pub fn items(&self) -> Vec<(DictKey, Value)> {
        self.state
            .borrow()
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Inserts or replaces one entry.
    ///
    /// Fires `Insert` for a new key and `Update` for an existing one.
    ///
    /// # Errors
    /// - `TypeMismatch` when `value` violates the guard.
    pub fn set(&self, key: impl Into<DictKey>, value: impl Into<Value>) -> HotResult<()> {
        let key = key.into();
        let value = value.into();
        let kind = {
            let mut state = self.state.borrow_mut();
            state.guard.check(&value)?;
            match state.entries.insert(key.clone(), value) {
                Some(_) => EventKind::Update,
                None => EventKind::Insert,
            }
        };
        fire(self, kind, EventKey::Key(key));
        Ok(())
    }

    /// Removes one entry and fires `Delete`.
    ///
    /// # Errors
    /// - `KeyNotFound` when `key` is absent.
    pub fn delete(&self, key: impl Into<DictKey>) -> HotResult<Value> {
        let key = key.into();
        let removed = self
            .state
            .borrow_mut()
            .entries
            .remove(&key)
            .ok_or_else(|| HotError::KeyNotFound(key.clone()))?;
        fire(self, EventKind::Delete, EventKey::Key(key));
        Ok(removed)
    }

    /// Empties the dict and fires `Reset` with the empty text key.
    pub fn clear(&self) {
        self.state.borrow_mut().entries.clear();
        fire(self, EventKind::Reset, EventKey::Text(String::new()));
    }

    /// Applies `set` to every entry in order.
    ///
    /// All values are validated before the first entry is written.
    pub fn update<I, K, V>(&self, entries: I) -> HotResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<DictKey>,
        V: Into<Value>,
    {
        let entries: Vec<(DictKey, Value)> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.state
            .borrow()
            .guard
            .check_all(entries.iter().map(|(_, value)| value))?;
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Replaces the whole mapping and fires one `Reset` with key `None`.
    pub fn copy_in<I, K, V>(&self, entries: I) -> HotResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<DictKey>,
        V: Into<Value>,
    {
        let entries: BTreeMap<DictKey, Value> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.state.borrow().guard.check_all(entries.values())?;
        self.replace_all(entries);
        Ok(())
    }

    pub(crate) fn replace_all(&self, entries: BTreeMap<DictKey, Value>) {
        self.state.borrow_mut().entries = entries;
        fire(self, EventKind::Reset, EventKey::None);
    }
}

impl Default for HotDict {
    fn default() -> Self {
        Self::new()
    }
}

impl HotNode for HotDict {
    fn core(&self) -> &Rc<NodeCore> {
        &self.core
    }

    fn node_ref(&self) -> NodeRef {
        NodeRef::Dict(self.clone())
    }
}

impl Debug for HotDict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotDict")
            .field("fqname", &self.fqname())
            .field("entries", &self.state.borrow().entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::HotDict;
    use crate::error::HotError;
    use crate::model::value::{DictKey, LeafKind, Value};
    use crate::node::event::{Event, EventKey, EventKind};
    use crate::node::listener::ListenerResult;
    use crate::node::HotNode;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record_events(dict: &HotDict) -> Rc<RefCell<Vec<(EventKind, EventKey)>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        dict.add_listener(move |event: &Event| -> ListenerResult {
            sink.borrow_mut().push((event.kind, event.key.clone()));
            Ok(())
        })
        .expect("root accepts listener");
        seen
    }

    #[test]
    fn set_distinguishes_insert_from_update() {
        let dict = HotDict::new();
        let seen = record_events(&dict);

        dict.set(12, "a").expect("insert");
        dict.set(12, "b").expect("update");
        dict.delete(12).expect("delete");

        assert_eq!(
            *seen.borrow(),
            vec![
                (EventKind::Insert, EventKey::Key(DictKey::Int(12))),
                (EventKind::Update, EventKey::Key(DictKey::Int(12))),
                (EventKind::Delete, EventKey::Key(DictKey::Int(12))),
            ]
        );
    }

    #[test]
    fn delete_of_missing_key_fails_without_event() {
        let dict = HotDict::with_entries([("a", 1)]).expect("dict");
        let seen = record_events(&dict);

        let err = dict.delete("b").expect_err("missing key");
        assert_eq!(err, HotError::KeyNotFound(DictKey::from("b")));
        assert!(seen.borrow().is_empty());
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn clear_fires_reset_with_empty_text_key() {
        let dict = HotDict::with_entries([(1, "x"), (2, "y")]).expect("dict");
        let seen = record_events(&dict);

        dict.clear();

        assert!(dict.is_empty());
        assert_eq!(
            *seen.borrow(),
            vec![(EventKind::Reset, EventKey::Text(String::new()))]
        );
    }

    #[test]
    fn update_validates_all_values_first() {
        let dict = HotDict::typed(LeafKind::Str);
        let seen = record_events(&dict);

        let err = dict
            .update(vec![(DictKey::from(1), Value::from("ok")), (DictKey::from(2), Value::from(2))])
            .expect_err("int value must be rejected");
        assert!(matches!(err, HotError::TypeMismatch { .. }));
        assert!(dict.is_empty());

        dict.update([(1, "one"), (2, "two")]).expect("strings accepted");
        assert_eq!(dict.keys(), vec![DictKey::Int(1), DictKey::Int(2)]);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn copy_in_fires_single_reset() {
        let dict = HotDict::with_entries([("a", 1)]).expect("dict");
        let seen = record_events(&dict);

        dict.copy_in([("b", 2), ("c", 3)]).expect("copy in");

        assert_eq!(dict.get("b"), Some(Value::from(2)));
        assert!(!dict.contains_key("a"));
        assert_eq!(*seen.borrow(), vec![(EventKind::Reset, EventKey::None)]);
    }
}
