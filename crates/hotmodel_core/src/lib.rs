//! Observable ("hot") data model engine.
//!
//! Application state is a tree of hot objects, lists and dicts. Every
//! mutation validates first, changes state, then fires one event
//! `(source, fqname, kind, key)` to the listeners registered on the root.
//! A `Mapper` listener routes those events to per-path handlers and views.
//!
//! The engine is single-threaded: handles are `Rc`-based and `!Send`.

pub mod config;
pub mod container;
pub mod error;
pub mod logging;
pub mod model;
pub mod node;
pub mod router;

pub use config::{HotConfig, DEFAULT_MAX_FIRE_DEPTH};
pub use container::dict::HotDict;
pub use container::list::HotList;
pub use container::object::{HotObject, PropertyType, PropertyValue};
pub use error::{HotError, HotResult};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::constraint::{LeafKinds, TypeConstraint, ValueGuard};
pub use model::value::{DictKey, FrozenSet, LeafKind, Record, RecordShape, Value};
pub use node::event::{Event, EventKey, EventKind};
pub use node::listener::{
    DiagnosticSink, Listener, ListenerError, ListenerFailure, ListenerRegistry, ListenerResult,
    LogSink,
};
pub use node::{HotNode, NodeId, NodeKind, NodeRef};
pub use router::mapper::{Mapper, ANY_PATH};
pub use router::view::{dispatch_to_view, ViewHandler};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
