//! Node identity layer.
//!
//! # Responsibility
//! - Give every hot node a stable id, a name and a parent link.
//! - Compute fully-qualified paths (`fqname`) by walking to the root.
//! - Route listener registration to the root of the tree.
//!
//! # Invariants
//! - Exactly the root of a tree holds a `ListenerRegistry`.
//! - Parent links are weak; the parent's property slot owns the child.
//! - A node is attached at most once and never under its own descendant.
//! - A node that already has listeners cannot become a child.

pub mod event;
pub mod listener;

use crate::config::HotConfig;
use crate::container::dict::HotDict;
use crate::container::list::HotList;
use crate::container::object::HotObject;
use crate::error::{HotError, HotResult};
use listener::{Listener, ListenerRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Stable identifier of one hot node.
pub type NodeId = Uuid;

static NODE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid node name regex"));

/// Returns whether `name` can be used as a path segment.
pub fn is_valid_node_name(name: &str) -> bool {
    NODE_NAME_RE.is_match(name)
}

enum Relation {
    Root(Rc<ListenerRegistry>),
    Child { name: String, parent: Weak<NodeCore> },
}

/// Identity and position of one node in its tree.
pub struct NodeCore {
    id: NodeId,
    relation: RefCell<Relation>,
}

impl NodeCore {
    pub(crate) fn new_root(config: HotConfig) -> Rc<Self> {
        Rc::new(Self {
            id: Uuid::new_v4(),
            relation: RefCell::new(Relation::Root(Rc::new(ListenerRegistry::new(config)))),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name under which the parent reaches this node; `None` for a root.
    pub fn name(&self) -> Option<String> {
        match &*self.relation.borrow() {
            Relation::Root(_) => None,
            Relation::Child { name, .. } => Some(name.clone()),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(&*self.relation.borrow(), Relation::Root(_))
    }

    /// Path from the root: `/` for the root, `/a/b` for nested children.
    ///
    /// A child whose parent was dropped resolves as if it hung off `/`.
    pub fn fqname(&self) -> String {
        match &*self.relation.borrow() {
            Relation::Root(_) => "/".to_string(),
            Relation::Child { name, parent } => {
                let mut path = parent
                    .upgrade()
                    .map(|parent| parent.fqname())
                    .unwrap_or_else(|| "/".to_string());
                if !path.ends_with('/') {
                    path.push('/');
                }
                path.push_str(name);
                path
            }
        }
    }

    fn parent(&self) -> Option<Rc<NodeCore>> {
        match &*self.relation.borrow() {
            Relation::Root(_) => None,
            Relation::Child { parent, .. } => parent.upgrade(),
        }
    }

    fn has_ancestor(&self, candidate: &Rc<NodeCore>) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if Rc::ptr_eq(&node, candidate) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Registry of the tree this node belongs to, found by walking up.
    pub(crate) fn registry(&self) -> Option<Rc<ListenerRegistry>> {
        match &*self.relation.borrow() {
            Relation::Root(registry) => Some(Rc::clone(registry)),
            Relation::Child { parent, .. } => parent.upgrade()?.registry(),
        }
    }

    fn own_registry(&self) -> Option<Rc<ListenerRegistry>> {
        match &*self.relation.borrow() {
            Relation::Root(registry) => Some(Rc::clone(registry)),
            Relation::Child { .. } => None,
        }
    }

    pub(crate) fn attach(self: &Rc<Self>, name: &str, parent: &Rc<NodeCore>) -> HotResult<()> {
        if !is_valid_node_name(name) {
            return Err(HotError::precondition(format!(
                "invalid node name `{name}`"
            )));
        }
        match &*self.relation.borrow() {
            Relation::Child { .. } => {
                return Err(HotError::precondition(format!(
                    "node is already attached at `{}`",
                    self.fqname()
                )));
            }
            Relation::Root(registry) if !registry.is_empty() => {
                return Err(HotError::precondition(
                    "a node with listeners cannot be attached under a parent",
                ));
            }
            Relation::Root(_) => {}
        }
        if Rc::ptr_eq(self, parent) || parent.has_ancestor(self) {
            return Err(HotError::precondition(format!(
                "attaching `{name}` under `{}` would create a cycle",
                parent.fqname()
            )));
        }

        *self.relation.borrow_mut() = Relation::Child {
            name: name.to_string(),
            parent: Rc::downgrade(parent),
        };
        Ok(())
    }
}

impl Debug for NodeCore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCore")
            .field("id", &self.id)
            .field("fqname", &self.fqname())
            .finish()
    }
}

/// Common identity and listener API of every hot node.
pub trait HotNode {
    fn core(&self) -> &Rc<NodeCore>;

    /// Type-erased handle to the same node.
    fn node_ref(&self) -> NodeRef;

    fn id(&self) -> NodeId {
        self.core().id()
    }

    fn name(&self) -> Option<String> {
        self.core().name()
    }

    fn fqname(&self) -> String {
        self.core().fqname()
    }

    fn is_root(&self) -> bool {
        self.core().is_root()
    }

    fn ptr_eq(&self, other: &impl HotNode) -> bool
    where
        Self: Sized,
    {
        Rc::ptr_eq(self.core(), other.core())
    }

    /// Attaches this detached root under `parent` at `name`.
    ///
    /// # Errors
    /// - `PrecondViolation` for an invalid name, a node that is already
    ///   attached or has listeners, or an attach that would form a cycle.
    fn set_relation(&self, name: &str, parent: &impl HotNode) -> HotResult<()>
    where
        Self: Sized,
    {
        self.core().attach(name, parent.core())
    }

    /// Appends a listener to the tree. Only valid on the root.
    ///
    /// # Errors
    /// - `PrecondViolation` when called on a child node.
    fn add_listener(&self, listener: impl Listener + 'static) -> HotResult<()>
    where
        Self: Sized,
    {
        let registry = self.core().own_registry().ok_or_else(|| {
            HotError::precondition(format!(
                "listeners can only be added to the root, not `{}`",
                self.fqname()
            ))
        })?;
        registry.push(Rc::new(listener));
        Ok(())
    }

    /// Shared registry of this node's tree.
    fn listener_registry(&self) -> Option<Rc<ListenerRegistry>> {
        self.core().registry()
    }

    fn listener_count(&self) -> usize {
        self.listener_registry()
            .map(|registry| registry.len())
            .unwrap_or(0)
    }
}

/// Kind of a hot node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Object,
    List,
    Dict,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::List => "list",
            Self::Dict => "dict",
        }
    }
}

/// Type-erased handle to any hot node.
#[derive(Clone)]
pub enum NodeRef {
    Object(HotObject),
    List(HotList),
    Dict(HotDict),
}

impl NodeRef {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Object(_) => NodeKind::Object,
            Self::List(_) => NodeKind::List,
            Self::Dict(_) => NodeKind::Dict,
        }
    }

    pub fn as_object(&self) -> Option<&HotObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&HotList> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&HotDict> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

impl HotNode for NodeRef {
    fn core(&self) -> &Rc<NodeCore> {
        match self {
            Self::Object(object) => object.core(),
            Self::List(list) => list.core(),
            Self::Dict(dict) => dict.core(),
        }
    }

    fn node_ref(&self) -> NodeRef {
        self.clone()
    }
}

impl Debug for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object(object) => object.fmt(f),
            Self::List(list) => list.fmt(f),
            Self::Dict(dict) => dict.fmt(f),
        }
    }
}

impl From<HotObject> for NodeRef {
    fn from(value: HotObject) -> Self {
        Self::Object(value)
    }
}

impl From<HotList> for NodeRef {
    fn from(value: HotList) -> Self {
        Self::List(value)
    }
}

impl From<HotDict> for NodeRef {
    fn from(value: HotDict) -> Self {
        Self::Dict(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_node_name, HotNode};
    use crate::container::list::HotList;
    use crate::container::object::HotObject;
    use crate::error::HotError;
    use crate::node::event::Event;
    use crate::node::listener::ListenerResult;

    fn noop(_event: &Event) -> ListenerResult {
        Ok(())
    }

    #[test]
    fn validates_node_names() {
        assert!(is_valid_node_name("member1"));
        assert!(is_valid_node_name("_private"));
        assert!(!is_valid_node_name(""));
        assert!(!is_valid_node_name("a/b"));
        assert!(!is_valid_node_name("1st"));
    }

    #[test]
    fn root_and_child_paths() {
        let root = HotObject::new();
        let middle = HotObject::new();
        let leaf = HotList::new();

        assert_eq!(root.fqname(), "/");
        assert!(root.is_root());
        assert_eq!(root.name(), None);

        middle.set_relation("member1", &root).expect("attach middle");
        leaf.set_relation("items", &middle).expect("attach leaf");

        assert_eq!(middle.fqname(), "/member1");
        assert_eq!(leaf.fqname(), "/member1/items");
        assert_eq!(leaf.name().as_deref(), Some("items"));
        assert!(!leaf.is_root());
    }

    #[test]
    fn orphaned_child_resolves_from_slash() {
        let child = HotList::new();
        {
            let parent = HotObject::new();
            child.set_relation("items", &parent).expect("attach");
        }
        assert_eq!(child.fqname(), "/items");
        assert!(child.listener_registry().is_none());
    }

    #[test]
    fn rejects_reparenting_cycles_and_bad_names() {
        let root = HotObject::new();
        let other = HotObject::new();
        let child = HotObject::new();
        child.set_relation("child", &root).expect("first attach");

        let err = child
            .set_relation("again", &other)
            .expect_err("re-parenting must fail");
        assert!(matches!(err, HotError::PrecondViolation(_)));

        let err = root
            .set_relation("loop", &child)
            .expect_err("cycle must fail");
        assert!(err.to_string().contains("cycle"));

        let err = other
            .set_relation("loop", &other)
            .expect_err("self attach must fail");
        assert!(matches!(err, HotError::PrecondViolation(_)));

        let fresh = HotList::new();
        assert!(fresh.set_relation("bad/name", &other).is_err());
    }

    #[test]
    fn listeners_live_on_the_root_only() {
        let root = HotObject::new();
        let child = HotList::new();
        child.set_relation("items", &root).expect("attach");

        root.add_listener(noop).expect("root accepts listeners");
        let err = child
            .add_listener(noop)
            .expect_err("child must reject listeners");
        assert!(matches!(err, HotError::PrecondViolation(_)));

        assert_eq!(root.listener_count(), 1);
        assert_eq!(child.listener_count(), 1);
    }

    #[test]
    fn node_with_listeners_cannot_be_attached() {
        let root = HotObject::new();
        let detached = HotList::new();
        detached.add_listener(noop).expect("detached root accepts listener");

        let err = detached
            .set_relation("items", &root)
            .expect_err("node with listeners must not be attached");
        assert!(matches!(err, HotError::PrecondViolation(_)));
    }
}
