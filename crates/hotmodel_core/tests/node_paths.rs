use hotmodel_core::{
    Event, EventKey, EventKind, HotDict, HotError, HotList, HotNode, HotObject, LeafKind,
    ListenerResult, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

fn recorder(root: &impl HotNode) -> Rc<RefCell<Vec<(String, EventKind, EventKey)>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    root.add_listener(move |event: &Event| -> ListenerResult {
        sink.borrow_mut()
            .push((event.fqname.clone(), event.kind, event.key.clone()));
        Ok(())
    })
    .expect("root accepts listener");
    seen
}

/// root -> member1 (object) -> member2 (object) -> items (list), tags (dict)
fn hierarchy() -> (HotObject, HotObject, HotObject, HotList, HotDict) {
    let root = HotObject::new();
    let member1 = HotObject::new();
    let member2 = HotObject::new();
    let items = HotList::new();
    let tags = HotDict::new();

    member2.declare_child("items", items.clone()).expect("items");
    member2.declare_child("tags", tags.clone()).expect("tags");
    member1.declare_child("member2", member2.clone()).expect("member2");
    root.declare_child("member1", member1.clone()).expect("member1");
    (root, member1, member2, items, tags)
}

#[test]
fn nested_nodes_report_joined_paths() {
    let (root, member1, member2, items, tags) = hierarchy();

    assert_eq!(root.fqname(), "/");
    assert_eq!(member1.fqname(), "/member1");
    assert_eq!(member2.fqname(), "/member1/member2");
    assert_eq!(items.fqname(), "/member1/member2/items");
    assert_eq!(tags.fqname(), "/member1/member2/tags");
}

#[test]
fn events_from_deep_children_reach_the_root() {
    let (root, _member1, member2, items, tags) = hierarchy();
    member2
        .declare_value("label", LeafKind::Str, true, None)
        .expect("label");
    let seen = recorder(&root);

    items.append(Value::from(1)).expect("append");
    tags.set("k", "v").expect("dict set");
    member2.set("label", "hello").expect("label write");

    assert_eq!(
        *seen.borrow(),
        vec![
            (
                "/member1/member2/items".to_string(),
                EventKind::Insert,
                EventKey::Index(0)
            ),
            (
                "/member1/member2/tags".to_string(),
                EventKind::Insert,
                EventKey::Key("k".into())
            ),
            (
                "/member1/member2".to_string(),
                EventKind::Update,
                EventKey::from("label")
            ),
        ]
    );
}

#[test]
fn every_node_shares_the_root_registry() {
    let (root, _member1, _member2, items, _tags) = hierarchy();
    let _seen = recorder(&root);

    let from_root = root.listener_registry().expect("root registry");
    let from_leaf = items.listener_registry().expect("leaf registry");
    assert!(Rc::ptr_eq(&from_root, &from_leaf));
    assert_eq!(items.listener_count(), 1);
}

#[test]
fn child_nodes_reject_listeners_and_reparenting() {
    let (_root, member1, _member2, items, _tags) = hierarchy();
    let other = HotObject::new();

    let err = items
        .add_listener(|_event: &Event| -> ListenerResult { Ok(()) })
        .expect_err("child must reject listeners");
    assert!(matches!(err, HotError::PrecondViolation(_)));

    let err = other
        .declare_child("stolen", member1.clone())
        .expect_err("attached node must not be re-parented");
    assert!(matches!(err, HotError::PrecondViolation(_)));
    assert!(!other.has_property("stolen"));
    assert_eq!(member1.fqname(), "/member1");
}

#[test]
fn dropped_parent_leaves_a_silent_orphan() {
    let items = HotList::new();
    {
        let parent = HotObject::new();
        parent.declare_child("items", items.clone()).expect("items");
        assert_eq!(items.fqname(), "/items");
    }

    items.append(Value::from(1)).expect("orphan still mutable");
    assert_eq!(items.fqname(), "/items");
    assert_eq!(items.listener_count(), 0);
    assert_eq!(items.len(), 1);
}
