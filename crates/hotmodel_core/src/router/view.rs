//! View handler contract.

use crate::node::event::{Event, EventKind};
use crate::node::listener::ListenerResult;

/// A view that patches itself per event kind.
///
/// `on_select` defaults to a no-op since most views do not track selection.
pub trait ViewHandler {
    fn on_reset(&self, event: &Event) -> ListenerResult;

    fn on_insert(&self, event: &Event) -> ListenerResult;

    fn on_update(&self, event: &Event) -> ListenerResult;

    fn on_delete(&self, event: &Event) -> ListenerResult;

    fn on_select(&self, _event: &Event) -> ListenerResult {
        Ok(())
    }
}

/// Calls the method of `view` matching the event kind.
pub fn dispatch_to_view<V>(view: &V, event: &Event) -> ListenerResult
where
    V: ViewHandler + ?Sized,
{
    match event.kind {
        EventKind::Reset => view.on_reset(event),
        EventKind::Insert => view.on_insert(event),
        EventKind::Update => view.on_update(event),
        EventKind::Delete => view.on_delete(event),
        EventKind::Select => view.on_select(event),
    }
}
