//! Listener registry and fire protocol.
//!
//! # Responsibility
//! - Hold the ordered listener list of one tree.
//! - Deliver each event to every listener exactly once, in registration order.
//! - Keep one failing listener from affecting the mutator or other listeners.
//!
//! # Invariants
//! - Listeners registered during a fire are not called for that fire.
//! - No node state is borrowed while listeners run, so listeners may read
//!   and mutate the model.
//! - Nested fires deeper than the configured bound are skipped and reported.

use crate::config::HotConfig;
use crate::logging::{panic_payload_summary, sanitize_message};
use crate::node::event::{Event, EventKey, EventKind};
use crate::node::HotNode;
use log::{debug, error, warn};
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

const MAX_FAILURE_CHARS: usize = 240;

/// Error type a listener may return.
pub type ListenerError = Box<dyn Error>;
/// Result of one listener invocation.
pub type ListenerResult = Result<(), ListenerError>;

/// Receives change events from a tree.
pub trait Listener {
    fn on_event(&self, event: &Event) -> ListenerResult;
}

impl<F> Listener for F
where
    F: Fn(&Event) -> ListenerResult,
{
    fn on_event(&self, event: &Event) -> ListenerResult {
        self(event)
    }
}

/// Why a listener did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerFailure {
    Error(String),
    Panic(String),
}

impl Display for ListenerFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(message) => write!(f, "error: {message}"),
            Self::Panic(message) => write!(f, "panic: {message}"),
        }
    }
}

/// Observer of fire-protocol diagnostics.
pub trait DiagnosticSink {
    fn event_fired(&self, _event: &Event, _listeners: usize) {}

    fn listener_failed(&self, event: &Event, failure: &ListenerFailure);

    fn fire_depth_exceeded(&self, event: &Event, limit: usize);
}

/// Default sink writing through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn event_fired(&self, event: &Event, listeners: usize) {
        debug!(
            "event=fire module=node status=ok fqname={} kind={} key={} listeners={}",
            event.fqname, event.kind, event.key, listeners
        );
    }

    fn listener_failed(&self, event: &Event, failure: &ListenerFailure) {
        error!(
            "event=listener_failed module=node status=error fqname={} kind={} key={} reason={}",
            event.fqname, event.kind, event.key, failure
        );
    }

    fn fire_depth_exceeded(&self, event: &Event, limit: usize) {
        warn!(
            "event=fire_depth_exceeded module=node status=skipped fqname={} kind={} limit={}",
            event.fqname, event.kind, limit
        );
    }
}

/// Ordered listeners of one tree, owned by its root.
pub struct ListenerRegistry {
    listeners: RefCell<Vec<Rc<dyn Listener>>>,
    depth: Cell<usize>,
    config: HotConfig,
}

impl ListenerRegistry {
    pub(crate) fn new(config: HotConfig) -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            depth: Cell::new(0),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    pub fn config(&self) -> &HotConfig {
        &self.config
    }

    pub(crate) fn push(&self, listener: Rc<dyn Listener>) {
        self.listeners.borrow_mut().push(listener);
    }

    /// Delivers one event to a snapshot of the registered listeners.
    pub fn dispatch(&self, event: &Event) {
        let sink = self.config.sink();
        let limit = self.config.max_fire_depth();
        if self.depth.get() >= limit {
            sink.fire_depth_exceeded(event, limit);
            return;
        }

        let listeners: Vec<Rc<dyn Listener>> = self.listeners.borrow().clone();
        sink.event_fired(event, listeners.len());

        let _depth = DepthGuard::enter(&self.depth);
        for listener in &listeners {
            if let Some(failure) = invoke_isolated(listener.as_ref(), event) {
                sink.listener_failed(event, &failure);
            }
        }
    }
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Runs one listener, converting errors and panics into a failure record.
pub(crate) fn invoke_isolated(listener: &dyn Listener, event: &Event) -> Option<ListenerFailure> {
    match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(ListenerFailure::Error(sanitize_message(
            &err.to_string(),
            MAX_FAILURE_CHARS,
        ))),
        Err(payload) => Some(ListenerFailure::Panic(panic_payload_summary(
            payload.as_ref(),
        ))),
    }
}

/// Builds an event for `node` and hands it to the tree's registry.
///
/// Callers must release every borrow of node state first.
pub(crate) fn fire(node: &impl HotNode, kind: EventKind, key: EventKey) {
    let core = node.core();
    let fqname = core.fqname();
    let Some(registry) = core.registry() else {
        debug!(
            "event=fire module=node status=skipped reason=orphan fqname={} kind={}",
            fqname, kind
        );
        return;
    };
    let event = Event {
        source: node.node_ref(),
        fqname,
        kind,
        key,
    };
    registry.dispatch(&event);
}

#[cfg(test)]
mod tests {
    use super::{DiagnosticSink, ListenerFailure, ListenerResult};
    use crate::config::HotConfig;
    use crate::container::list::HotList;
    use crate::model::value::Value;
    use crate::node::event::{Event, EventKind};
    use crate::node::HotNode;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingSink {
        failures: RefCell<Vec<ListenerFailure>>,
        skipped: RefCell<Vec<usize>>,
    }

    impl DiagnosticSink for Rc<RecordingSink> {
        fn listener_failed(&self, _event: &Event, failure: &ListenerFailure) {
            self.failures.borrow_mut().push(failure.clone());
        }

        fn fire_depth_exceeded(&self, _event: &Event, limit: usize) {
            self.skipped.borrow_mut().push(limit);
        }
    }

    #[test]
    fn failing_listeners_do_not_stop_delivery() {
        let sink = Rc::new(RecordingSink::default());
        let config = HotConfig::new().with_sink(Rc::clone(&sink));
        let list = HotList::with_config(Default::default(), Vec::new(), config).expect("list");
        let seen = Rc::new(RefCell::new(Vec::new()));

        list.add_listener(|_event: &Event| -> ListenerResult { Err("first failed".into()) })
            .expect("add failing listener");
        list.add_listener(|_event: &Event| -> ListenerResult { panic!("second panicked") })
            .expect("add panicking listener");
        let seen_in_listener = Rc::clone(&seen);
        list.add_listener(move |event: &Event| -> ListenerResult {
            seen_in_listener.borrow_mut().push(event.kind);
            Ok(())
        })
        .expect("add recording listener");

        list.append(Value::from(1)).expect("append succeeds");

        assert_eq!(*seen.borrow(), vec![EventKind::Insert]);
        assert_eq!(list.len(), 1);
        let failures = sink.failures.borrow();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0], ListenerFailure::Error("first failed".to_string()));
        assert!(matches!(&failures[1], ListenerFailure::Panic(message) if message.contains("second panicked")));
    }

    #[test]
    fn nested_fires_stop_at_configured_depth() {
        let sink = Rc::new(RecordingSink::default());
        let config = HotConfig::new()
            .with_max_fire_depth(3)
            .with_sink(Rc::clone(&sink));
        let list = HotList::with_config(Default::default(), Vec::new(), config).expect("list");
        let handle = list.clone();
        list.add_listener(move |_event: &Event| -> ListenerResult {
            handle.append(Value::from(0))?;
            Ok(())
        })
        .expect("add echoing listener");

        list.append(Value::from(0)).expect("append succeeds");

        // One direct append plus three listener appends before the bound hits.
        assert_eq!(list.len(), 4);
        assert_eq!(*sink.skipped.borrow(), vec![3]);
    }

    #[test]
    fn listeners_added_during_fire_wait_for_next_event() {
        let list = HotList::new();
        let calls = Rc::new(RefCell::new(0usize));
        let handle = list.clone();
        let late_calls = Rc::clone(&calls);
        list.add_listener(move |_event: &Event| -> ListenerResult {
            let counter = Rc::clone(&late_calls);
            if handle.listener_count() == 1 {
                handle.add_listener(move |_event: &Event| -> ListenerResult {
                    *counter.borrow_mut() += 1;
                    Ok(())
                })?;
            }
            Ok(())
        })
        .expect("add registering listener");

        list.append(Value::from(1)).expect("first append");
        assert_eq!(*calls.borrow(), 0);
        list.append(Value::from(2)).expect("second append");
        assert_eq!(*calls.borrow(), 1);
    }
}
