//! Observable record node with declared hot properties.
//!
//! # Responsibility
//! - Hold declared hot properties (leaf values or owned child nodes) plus
//!   free-form plain attributes that never fire.
//! - Validate leaf writes and fire `Update` keyed by the property name.
//!
//! # Invariants
//! - A property is declared once; declaration order is preserved.
//! - Node-typed slots keep their child for life; assigning contents copies
//!   into the child instead of rebinding the slot.
//! - Writing a value equal to the current one is a silent no-op.

use crate::config::HotConfig;
use crate::container::dict::HotDict;
use crate::container::list::HotList;
use crate::error::{HotError, HotResult};
use crate::model::constraint::{TypeConstraint, ValueGuard};
use crate::model::value::{DictKey, LeafKind, RecordShape, Value};
use crate::node::event::{EventKey, EventKind};
use crate::node::listener::fire;
use crate::node::{is_valid_node_name, HotNode, NodeCore, NodeKind, NodeRef};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use std::sync::Arc;

/// Declared type of a hot property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
    /// Immutable value checked by a guard.
    Value(ValueGuard),
    /// Owned child node of the given kind.
    Node(NodeKind),
}

impl From<ValueGuard> for PropertyType {
    fn from(value: ValueGuard) -> Self {
        Self::Value(value)
    }
}

impl From<TypeConstraint> for PropertyType {
    fn from(value: TypeConstraint) -> Self {
        Self::Value(ValueGuard::typed(value))
    }
}

impl From<LeafKind> for PropertyType {
    fn from(value: LeafKind) -> Self {
        Self::Value(ValueGuard::typed(value))
    }
}

impl From<Arc<RecordShape>> for PropertyType {
    fn from(value: Arc<RecordShape>) -> Self {
        Self::Value(ValueGuard::typed(value))
    }
}

impl From<NodeKind> for PropertyType {
    fn from(value: NodeKind) -> Self {
        Self::Node(value)
    }
}

/// Value offered to a property, either at declaration or on assignment.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// Leaf value; `None` clears a nullable slot.
    Value(Option<Value>),
    /// Replacement elements for a list-typed slot.
    Items(Vec<Value>),
    /// Replacement entries for a dict-typed slot.
    Entries(Vec<(DictKey, Value)>),
    /// A node instance; only valid when declaring a node-typed slot.
    Node(NodeRef),
}

impl PropertyValue {
    fn describe(&self) -> String {
        match self {
            Self::Value(Some(value)) => value.type_name(),
            Self::Value(None) => "none".to_string(),
            Self::Items(_) => "sequence items".to_string(),
            Self::Entries(_) => "mapping entries".to_string(),
            Self::Node(node) => format!("{} node", node.kind().as_str()),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        Self::Value(Some(value))
    }
}

impl From<Option<Value>> for PropertyValue {
    fn from(value: Option<Value>) -> Self {
        Self::Value(value)
    }
}

impl From<NodeRef> for PropertyValue {
    fn from(value: NodeRef) -> Self {
        Self::Node(value)
    }
}

impl From<HotObject> for PropertyValue {
    fn from(value: HotObject) -> Self {
        Self::Node(NodeRef::Object(value))
    }
}

impl From<HotList> for PropertyValue {
    fn from(value: HotList) -> Self {
        Self::Node(NodeRef::List(value))
    }
}

impl From<HotDict> for PropertyValue {
    fn from(value: HotDict) -> Self {
        Self::Node(NodeRef::Dict(value))
    }
}

enum Slot {
    Value {
        guard: ValueGuard,
        allow_none: bool,
        value: Option<Value>,
    },
    Node(NodeRef),
}

struct HotProperty {
    name: String,
    slot: Slot,
}

#[derive(Default)]
struct ObjectState {
    properties: Vec<HotProperty>,
    attributes: BTreeMap<String, Value>,
}

impl ObjectState {
    fn find(&self, name: &str) -> Option<&HotProperty> {
        self.properties.iter().find(|property| property.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut HotProperty> {
        self.properties
            .iter_mut()
            .find(|property| property.name == name)
    }
}

enum SlotTarget {
    Undeclared,
    Value,
    Node(NodeRef),
}

enum CopyStep {
    Leaf { name: String, value: Option<Value> },
    List(HotList, Vec<Value>),
    Dict(HotDict, BTreeMap<DictKey, Value>),
    Object(HotObject, Vec<CopyStep>),
}

/// Hot object: named properties plus plain attributes.
///
/// Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct HotObject {
    core: Rc<NodeCore>,
    state: Rc<RefCell<ObjectState>>,
}

impl HotObject {
    pub fn new() -> Self {
        Self::with_config(HotConfig::default())
    }

    /// Creates a root object whose tree uses `config`.
    pub fn with_config(config: HotConfig) -> Self {
        Self {
            core: NodeCore::new_root(config),
            state: Rc::new(RefCell::new(ObjectState::default())),
        }
    }

    /// Declares a hot property.
    ///
    /// A node-typed property adopts `initial` as its child under `name`.
    ///
    /// # Errors
    /// - `DuplicateDeclaration` when `name` is already a hot property.
    /// - `PrecondViolation` for an invalid name, a nullable node slot, or a
    ///   child that cannot be attached.
    /// - `TypeMismatch` / `NullNotAllowed` when `initial` does not fit.
    pub fn declare_property(
        &self,
        name: &str,
        type_info: impl Into<PropertyType>,
        allow_none: bool,
        initial: impl Into<PropertyValue>,
    ) -> HotResult<()> {
        if !is_valid_node_name(name) {
            return Err(HotError::precondition(format!(
                "invalid property name `{name}`"
            )));
        }
        if self.state.borrow().find(name).is_some() {
            return Err(HotError::DuplicateDeclaration(name.to_string()));
        }

        let slot = match (type_info.into(), initial.into()) {
            (PropertyType::Node(_), _) if allow_none => {
                return Err(HotError::precondition(format!(
                    "node property `{name}` cannot allow none"
                )));
            }
            (PropertyType::Node(kind), PropertyValue::Node(child)) => {
                if child.kind() != kind {
                    return Err(HotError::mismatch(
                        format!("{} node", kind.as_str()),
                        format!("{} node", child.kind().as_str()),
                    ));
                }
                child.set_relation(name, self)?;
                Slot::Node(child)
            }
            (PropertyType::Node(kind), other) => {
                return Err(HotError::mismatch(
                    format!("{} node", kind.as_str()),
                    other.describe(),
                ));
            }
            (PropertyType::Value(guard), PropertyValue::Value(value)) => {
                check_leaf(name, &guard, allow_none, value.as_ref())?;
                Slot::Value {
                    guard,
                    allow_none,
                    value,
                }
            }
            (PropertyType::Value(guard), other) => {
                return Err(HotError::mismatch(
                    guard.constraint().to_string(),
                    other.describe(),
                ));
            }
        };

        let mut state = self.state.borrow_mut();
        state.attributes.remove(name);
        state.properties.push(HotProperty {
            name: name.to_string(),
            slot,
        });
        Ok(())
    }

    /// Declares a leaf property.
    pub fn declare_value(
        &self,
        name: &str,
        type_info: impl Into<PropertyType>,
        allow_none: bool,
        initial: Option<Value>,
    ) -> HotResult<()> {
        self.declare_property(name, type_info, allow_none, initial)
    }

    /// Declares a node property owning `child`.
    pub fn declare_child(&self, name: &str, child: impl Into<NodeRef>) -> HotResult<()> {
        let child = child.into();
        let kind = child.kind();
        self.declare_property(name, kind, false, child)
    }

    /// Assigns to a property or plain attribute.
    ///
    /// - Leaf property: validated, stored, then `Update` fires with the
    ///   property name as key. Equal values are ignored.
    /// - Node property: `Items`/`Entries` are copied into the child, which
    ///   fires its own `Reset`. Passing the slot's own node is a no-op.
    /// - Undeclared name: stored as a plain attribute without firing;
    ///   `None` removes it.
    ///
    /// # Errors
    /// - `ImmutableSlot` when a node property is given another node.
    /// - `NullNotAllowed` / `TypeMismatch` when validation fails.
    pub fn set_property(&self, name: &str, value: impl Into<PropertyValue>) -> HotResult<()> {
        let value = value.into();
        match self.slot_target(name) {
            SlotTarget::Undeclared => self.set_attribute(name, value),
            SlotTarget::Value => self.write_leaf(name, value),
            SlotTarget::Node(child) => copy_into_child(name, &child, value),
        }
    }

    /// Assigns a non-null leaf value.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> HotResult<()> {
        self.set_property(name, PropertyValue::Value(Some(value.into())))
    }

    /// Assigns `None` to a leaf property, or removes a plain attribute.
    pub fn unset(&self, name: &str) -> HotResult<()> {
        self.set_property(name, PropertyValue::Value(None))
    }

    /// Reads a leaf property or plain attribute.
    ///
    /// # Errors
    /// - `UnknownProperty` when `name` is neither.
    /// - `TypeMismatch` when `name` is a node property.
    pub fn get(&self, name: &str) -> HotResult<Option<Value>> {
        let state = self.state.borrow();
        match state.find(name) {
            Some(HotProperty {
                slot: Slot::Value { value, .. },
                ..
            }) => Ok(value.clone()),
            Some(HotProperty {
                slot: Slot::Node(child),
                ..
            }) => Err(HotError::mismatch(
                "leaf property",
                format!("{} node", child.kind().as_str()),
            )),
            None => state
                .attributes
                .get(name)
                .map(|value| Some(value.clone()))
                .ok_or_else(|| HotError::UnknownProperty(name.to_string())),
        }
    }

    /// Returns the child node held by a node property.
    pub fn child(&self, name: &str) -> HotResult<NodeRef> {
        match self.slot_target(name) {
            SlotTarget::Node(child) => Ok(child),
            SlotTarget::Value => Err(HotError::mismatch("node property", "leaf property")),
            SlotTarget::Undeclared => Err(HotError::UnknownProperty(name.to_string())),
        }
    }

    pub fn list(&self, name: &str) -> HotResult<HotList> {
        match self.child(name)? {
            NodeRef::List(list) => Ok(list),
            other => Err(HotError::mismatch(
                "list node",
                format!("{} node", other.kind().as_str()),
            )),
        }
    }

    pub fn dict(&self, name: &str) -> HotResult<HotDict> {
        match self.child(name)? {
            NodeRef::Dict(dict) => Ok(dict),
            other => Err(HotError::mismatch(
                "dict node",
                format!("{} node", other.kind().as_str()),
            )),
        }
    }

    pub fn object(&self, name: &str) -> HotResult<HotObject> {
        match self.child(name)? {
            NodeRef::Object(object) => Ok(object),
            other => Err(HotError::mismatch(
                "object node",
                format!("{} node", other.kind().as_str()),
            )),
        }
    }

    /// Hot property names in declaration order.
    pub fn property_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .properties
            .iter()
            .map(|property| property.name.clone())
            .collect()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.state.borrow().find(name).is_some()
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.state.borrow().attributes.keys().cloned().collect()
    }

    /// Copies every same-named property of `other` into this object.
    ///
    /// Leaf slots are written silently; child lists, dicts and objects are
    /// copied recursively and each fires its own `Reset`. This object then
    /// fires one `Reset` with key `None`. Everything is validated before the
    /// first write.
    ///
    /// # Errors
    /// - `TypeMismatch` / `NullNotAllowed` when a value does not fit, or a
    ///   same-named property has a different node kind.
    pub fn copy_in(&self, other: &HotObject) -> HotResult<()> {
        if self.ptr_eq(other) {
            return Ok(());
        }
        let steps = self.plan_copy(other)?;
        self.apply_copy(steps);
        Ok(())
    }

    /// Fires `Select` on this node; the model does not track selections.
    pub fn fire_select(&self, key: impl Into<EventKey>) {
        fire(self, EventKind::Select, key.into());
    }

    fn slot_target(&self, name: &str) -> SlotTarget {
        match self.state.borrow().find(name) {
            None => SlotTarget::Undeclared,
            Some(HotProperty {
                slot: Slot::Value { .. },
                ..
            }) => SlotTarget::Value,
            Some(HotProperty {
                slot: Slot::Node(child),
                ..
            }) => SlotTarget::Node(child.clone()),
        }
    }

    fn set_attribute(&self, name: &str, value: PropertyValue) -> HotResult<()> {
        match value {
            PropertyValue::Value(Some(value)) => {
                self.state
                    .borrow_mut()
                    .attributes
                    .insert(name.to_string(), value);
                Ok(())
            }
            PropertyValue::Value(None) => {
                self.state.borrow_mut().attributes.remove(name);
                Ok(())
            }
            other => Err(HotError::mismatch("plain value", other.describe())),
        }
    }

    fn write_leaf(&self, name: &str, value: PropertyValue) -> HotResult<()> {
        let value = match value {
            PropertyValue::Value(value) => value,
            other => return Err(HotError::mismatch("leaf value", other.describe())),
        };
        {
            let mut state = self.state.borrow_mut();
            let property = state
                .find_mut(name)
                .ok_or_else(|| HotError::UnknownProperty(name.to_string()))?;
            let Slot::Value {
                guard,
                allow_none,
                value: current,
            } = &mut property.slot
            else {
                return Err(HotError::ImmutableSlot(name.to_string()));
            };
            if *current == value {
                return Ok(());
            }
            check_leaf(name, guard, *allow_none, value.as_ref())?;
            *current = value;
        }
        fire(self, EventKind::Update, EventKey::Text(name.to_string()));
        Ok(())
    }

    fn plan_copy(&self, other: &HotObject) -> HotResult<Vec<CopyStep>> {
        let state = self.state.borrow();
        let source = other.state.borrow();
        let mut steps = Vec::new();
        for property in &state.properties {
            let Some(incoming) = source.find(&property.name) else {
                continue;
            };
            let step = match (&property.slot, &incoming.slot) {
                (
                    Slot::Value {
                        guard, allow_none, ..
                    },
                    Slot::Value { value, .. },
                ) => {
                    check_leaf(&property.name, guard, *allow_none, value.as_ref())?;
                    CopyStep::Leaf {
                        name: property.name.clone(),
                        value: value.clone(),
                    }
                }
                (Slot::Node(NodeRef::List(target)), Slot::Node(NodeRef::List(from))) => {
                    let items = from.to_vec();
                    target.guard().check_all(&items)?;
                    CopyStep::List(target.clone(), items)
                }
                (Slot::Node(NodeRef::Dict(target)), Slot::Node(NodeRef::Dict(from))) => {
                    let entries: BTreeMap<DictKey, Value> = from.items().into_iter().collect();
                    target.guard().check_all(entries.values())?;
                    CopyStep::Dict(target.clone(), entries)
                }
                (Slot::Node(NodeRef::Object(target)), Slot::Node(NodeRef::Object(from))) => {
                    if target.ptr_eq(from) {
                        continue;
                    }
                    CopyStep::Object(target.clone(), target.plan_copy(from)?)
                }
                (target, from) => {
                    return Err(HotError::mismatch(
                        format!("{} for `{}`", describe_slot(target), property.name),
                        describe_slot(from),
                    ));
                }
            };
            steps.push(step);
        }
        Ok(steps)
    }

    fn apply_copy(&self, steps: Vec<CopyStep>) {
        let mut children = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            for step in steps {
                match step {
                    CopyStep::Leaf { name, value } => {
                        if let Some(HotProperty {
                            slot: Slot::Value { value: current, .. },
                            ..
                        }) = state.find_mut(&name)
                        {
                            *current = value;
                        }
                    }
                    child => children.push(child),
                }
            }
        }
        for child in children {
            match child {
                CopyStep::List(list, items) => list.replace_all(items),
                CopyStep::Dict(dict, entries) => dict.replace_all(entries),
                CopyStep::Object(object, steps) => object.apply_copy(steps),
                CopyStep::Leaf { .. } => {}
            }
        }
        fire(self, EventKind::Reset, EventKey::None);
    }
}

impl Default for HotObject {
    fn default() -> Self {
        Self::new()
    }
}

impl HotNode for HotObject {
    fn core(&self) -> &Rc<NodeCore> {
        &self.core
    }

    fn node_ref(&self) -> NodeRef {
        NodeRef::Object(self.clone())
    }
}

impl Debug for HotObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotObject")
            .field("fqname", &self.fqname())
            .field("properties", &self.property_names())
            .finish()
    }
}

fn check_leaf(
    name: &str,
    guard: &ValueGuard,
    allow_none: bool,
    value: Option<&Value>,
) -> HotResult<()> {
    match value {
        Some(value) => guard.check(value),
        None if allow_none => Ok(()),
        None => Err(HotError::NullNotAllowed(name.to_string())),
    }
}

fn copy_into_child(name: &str, child: &NodeRef, value: PropertyValue) -> HotResult<()> {
    match (child, value) {
        (_, PropertyValue::Node(source)) if source.ptr_eq(child) => Ok(()),
        (_, PropertyValue::Node(_)) => Err(HotError::ImmutableSlot(name.to_string())),
        (NodeRef::List(list), PropertyValue::Items(items)) => list.copy_in(items),
        (NodeRef::Dict(dict), PropertyValue::Entries(entries)) => dict.copy_in(entries),
        (child, other) => Err(HotError::mismatch(
            format!("contents for {} node `{name}`", child.kind().as_str()),
            other.describe(),
        )),
    }
}

fn describe_slot(slot: &Slot) -> String {
    match slot {
        Slot::Value { .. } => "leaf property".to_string(),
        Slot::Node(node) => format!("{} node", node.kind().as_str()),
    }
}
