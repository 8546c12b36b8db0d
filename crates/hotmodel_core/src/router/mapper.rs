//! Path and kind based event router.
//!
//! # Invariants
//! - Handlers for one event run in bucket order: exact `(fqname, kind)`,
//!   then `(fqname, any kind)`, then `(any path, kind)`, then
//!   `(any path, any kind)`; within a bucket, in registration order.
//! - A failing handler is reported and does not stop later handlers.
//! - The route table is read through a snapshot, so handlers may add routes.

use crate::node::event::{Event, EventKind};
use crate::node::listener::{
    invoke_isolated, DiagnosticSink, Listener, ListenerResult, LogSink,
};
use crate::router::view::{dispatch_to_view, ViewHandler};
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Path wildcard: matches every `fqname`.
pub const ANY_PATH: &str = "";

type RouteKey = (String, Option<EventKind>);

/// Router installed as a tree listener.
///
/// Cloning yields another handle to the same route table.
#[derive(Clone)]
pub struct Mapper {
    routes: Rc<RefCell<BTreeMap<RouteKey, Vec<Rc<dyn Listener>>>>>,
    sink: Rc<dyn DiagnosticSink>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::with_sink(LogSink)
    }

    pub fn with_sink(sink: impl DiagnosticSink + 'static) -> Self {
        Self {
            routes: Rc::new(RefCell::new(BTreeMap::new())),
            sink: Rc::new(sink),
        }
    }

    /// Registers `handler` for `fqname` (or `ANY_PATH`) and `kind` (or any
    /// kind when `None`).
    pub fn add_route(&self, fqname: &str, kind: Option<EventKind>, handler: impl Listener + 'static) {
        self.routes
            .borrow_mut()
            .entry((fqname.to_string(), kind))
            .or_default()
            .push(Rc::new(handler));
    }

    /// Registers a view for every event kind at `fqname`.
    pub fn add_view<V>(&self, fqname: &str, view: Rc<V>)
    where
        V: ViewHandler + 'static,
    {
        self.add_route(fqname, None, move |event: &Event| -> ListenerResult {
            dispatch_to_view(view.as_ref(), event)
        });
    }

    /// Total number of registered handlers.
    pub fn route_count(&self) -> usize {
        self.routes.borrow().values().map(Vec::len).sum()
    }

    /// Handlers that would receive an event, in call order.
    pub fn matching(&self, fqname: &str, kind: EventKind) -> Vec<Rc<dyn Listener>> {
        let routes = self.routes.borrow();
        let buckets = [
            (fqname, Some(kind)),
            (fqname, None),
            (ANY_PATH, Some(kind)),
            (ANY_PATH, None),
        ];
        let mut handlers = Vec::new();
        for (index, (path, bucket_kind)) in buckets.into_iter().enumerate() {
            if fqname == ANY_PATH && index < 2 {
                continue;
            }
            if let Some(found) = routes.get(&(path.to_string(), bucket_kind)) {
                handlers.extend(found.iter().cloned());
            }
        }
        handlers
    }

    /// Delivers one event to every matching handler.
    pub fn dispatch(&self, event: &Event) {
        let handlers = self.matching(&event.fqname, event.kind);
        if handlers.is_empty() {
            debug!(
                "event=route module=router status=unrouted fqname={} kind={}",
                event.fqname, event.kind
            );
            return;
        }
        for handler in &handlers {
            if let Some(failure) = invoke_isolated(handler.as_ref(), event) {
                self.sink.listener_failed(event, &failure);
            }
        }
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener for Mapper {
    fn on_event(&self, event: &Event) -> ListenerResult {
        self.dispatch(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Mapper, ANY_PATH};
    use crate::container::list::HotList;
    use crate::container::object::HotObject;
    use crate::node::event::{Event, EventKind};
    use crate::node::listener::ListenerResult;
    use crate::node::HotNode;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tag(log: &Rc<RefCell<Vec<String>>>, name: &'static str) -> impl Fn(&Event) -> ListenerResult {
        let log = Rc::clone(log);
        move |event: &Event| -> ListenerResult {
            log.borrow_mut()
                .push(format!("{name}:{}:{}", event.fqname, event.kind));
            Ok(())
        }
    }

    #[test]
    fn buckets_run_from_most_to_least_specific() {
        let root = HotObject::new();
        let items = HotList::new();
        root.declare_child("items", items.clone()).expect("declare");
        let mapper = Mapper::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        mapper.add_route(ANY_PATH, None, tag(&log, "all"));
        mapper.add_route(ANY_PATH, Some(EventKind::Insert), tag(&log, "any_insert"));
        mapper.add_route("/items", None, tag(&log, "items"));
        mapper.add_route("/items", Some(EventKind::Insert), tag(&log, "items_insert"));
        root.add_listener(mapper.clone()).expect("install mapper");

        items.append(1).expect("append");

        assert_eq!(
            *log.borrow(),
            vec![
                "items_insert:/items:insert",
                "items:/items:insert",
                "any_insert:/items:insert",
                "all:/items:insert",
            ]
        );
        assert_eq!(mapper.route_count(), 4);
    }

    #[test]
    fn unmatched_paths_only_reach_wildcards() {
        let root = HotObject::new();
        let mapper = Mapper::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        mapper.add_route("/process", None, tag(&log, "process"));
        mapper.add_route(ANY_PATH, Some(EventKind::Reset), tag(&log, "reset"));
        root.add_listener(mapper).expect("install mapper");

        root.declare_value("sn", crate::model::value::LeafKind::Int, true, None)
            .expect("declare sn");
        root.set("sn", 7).expect("write sn");
        root.fire_select("sn");

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn failing_handler_does_not_block_the_next_one() {
        let root = HotList::new();
        let mapper = Mapper::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        mapper.add_route("/", None, |_event: &Event| -> ListenerResult {
            Err("view out of sync".into())
        });
        mapper.add_route("/", None, tag(&log, "second"));
        root.add_listener(mapper).expect("install mapper");

        root.append(1).expect("append");

        assert_eq!(*log.borrow(), vec!["second:/:insert"]);
    }
}
