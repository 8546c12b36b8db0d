use hotmodel_core::{
    Event, EventKey, EventKind, HotConfig, HotList, HotNode, HotObject, LeafKind, ListenerResult,
    Mapper, RecordShape, Value, ANY_PATH,
};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn typed_record_list_scenario() {
    let pair = RecordShape::new("Pair", ["id", "label"]);
    let root = HotObject::new();
    root.declare_child("rows", HotList::typed(pair.clone()))
        .expect("declare rows");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    root.add_listener(move |event: &Event| -> ListenerResult {
        sink.borrow_mut()
            .push((event.fqname.clone(), event.kind, event.key.clone()));
        Ok(())
    })
    .expect("add listener");

    let rows = root.list("rows").expect("rows");
    rows.append(pair.record([Value::from(1), Value::from("a")]).expect("row a"))
        .expect("append a");
    rows.append(pair.record([Value::from(2), Value::from("b")]).expect("row b"))
        .expect("append b");
    rows.delete(0).expect("delete first");

    assert_eq!(
        *seen.borrow(),
        vec![
            ("/rows".to_string(), EventKind::Insert, EventKey::Index(0)),
            ("/rows".to_string(), EventKind::Insert, EventKey::Index(1)),
            ("/rows".to_string(), EventKind::Delete, EventKey::Index(0)),
        ]
    );
    let remaining = rows.to_vec();
    assert_eq!(remaining.len(), 1);
    let record = remaining[0].as_record().expect("record row");
    assert_eq!(record.get("id"), Some(&Value::from(2)));
    assert_eq!(record.get("label"), Some(&Value::from("b")));
}

#[test]
fn self_feeding_listener_is_bounded() {
    let root = HotObject::with_config(HotConfig::new().with_max_fire_depth(5));
    root.declare_value("counter", LeafKind::Int, false, Some(Value::from(0)))
        .expect("declare counter");
    let handle = root.clone();
    root.add_listener(move |_event: &Event| -> ListenerResult {
        let current = handle
            .get("counter")?
            .and_then(|value| value.as_int())
            .unwrap_or_default();
        handle.set("counter", current + 1)?;
        Ok(())
    })
    .expect("add listener");

    root.set("counter", 1).expect("first write");

    // The direct write plus five nested listener writes; the sixth fire is skipped.
    assert_eq!(root.get("counter").expect("counter"), Some(Value::from(6)));
}

#[test]
fn production_style_selection_routes() {
    let operation = RecordShape::new("ProcessOperation", ["operation", "act"]);
    let model = HotObject::new();
    model
        .declare_value("article", LeafKind::Str, true, None)
        .expect("article");
    model
        .declare_child("process", HotList::typed(operation.clone()))
        .expect("process");
    model
        .declare_value("process_selection", LeafKind::Int, true, None)
        .expect("process_selection");

    let log = Rc::new(RefCell::new(Vec::new()));
    let mapper = Mapper::new();
    for (path, kind, name) in [
        ("/process", None, "process_view"),
        ("/", Some(EventKind::Select), "selection"),
        (ANY_PATH, Some(EventKind::Reset), "any_reset"),
    ] {
        let log = Rc::clone(&log);
        mapper.add_route(path, kind, move |event: &Event| -> ListenerResult {
            log.borrow_mut()
                .push(format!("{name} {} {} {}", event.fqname, event.kind, event.key));
            Ok(())
        });
    }
    model.add_listener(mapper).expect("install mapper");

    model.set("article", "A-1003").expect("article");
    model
        .list("process")
        .expect("process list")
        .copy_in(vec![
            Value::from(operation.record([Value::from("cut"), Value::from("A1")]).expect("cut")),
            Value::from(operation.record([Value::from("weld"), Value::from("A2")]).expect("weld")),
        ])
        .expect("load process");
    model.set("process_selection", 1).expect("select");
    model.fire_select("process_selection");

    assert_eq!(
        *log.borrow(),
        vec![
            "process_view /process reset none",
            "any_reset /process reset none",
            "selection / select \"process_selection\"",
        ]
    );
}
