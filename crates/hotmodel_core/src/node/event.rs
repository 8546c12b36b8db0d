//! Event records delivered to listeners.

use crate::model::value::DictKey;
use crate::node::NodeRef;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::str::FromStr;

/// Kind of change a node reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Contents fully replaced; views should rebuild.
    Reset,
    Insert,
    Update,
    Delete,
    /// Selection moved; raised explicitly by domain code.
    Select,
}

/// Event name for `EventKind::Reset`.
pub const EVENT_RESET: &str = "reset";
/// Event name for `EventKind::Insert`.
pub const EVENT_INSERT: &str = "insert";
/// Event name for `EventKind::Update`.
pub const EVENT_UPDATE: &str = "update";
/// Event name for `EventKind::Delete`.
pub const EVENT_DELETE: &str = "delete";
/// Event name for `EventKind::Select`.
pub const EVENT_SELECT: &str = "select";

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::Reset,
        Self::Insert,
        Self::Update,
        Self::Delete,
        Self::Select,
    ];

    /// Stable lowercase event name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reset => EVENT_RESET,
            Self::Insert => EVENT_INSERT,
            Self::Update => EVENT_UPDATE,
            Self::Delete => EVENT_DELETE,
            Self::Select => EVENT_SELECT,
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if normalized.is_empty() {
            return Err(EventKindParseError::Empty);
        }
        match normalized {
            EVENT_RESET => Ok(Self::Reset),
            EVENT_INSERT => Ok(Self::Insert),
            EVENT_UPDATE => Ok(Self::Update),
            EVENT_DELETE => Ok(Self::Delete),
            EVENT_SELECT => Ok(Self::Select),
            other => Err(EventKindParseError::Unsupported(other.to_string())),
        }
    }
}

/// Event name parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKindParseError {
    Empty,
    Unsupported(String),
}

impl Display for EventKindParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "event name must not be empty"),
            Self::Unsupported(value) => write!(f, "event name is unsupported: {value}"),
        }
    }
}

impl Error for EventKindParseError {}

/// Where in the source node the change happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKey {
    None,
    /// Natural (non-negative) sequence position.
    Index(usize),
    /// Resolved slice bounds of a bulk sequence change.
    Slice(Range<usize>),
    /// Property name, or the empty marker of `HotDict::clear`.
    Text(String),
    Key(DictKey),
}

impl EventKey {
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn dict_key(&self) -> Option<&DictKey> {
        match self {
            Self::Key(key) => Some(key),
            _ => None,
        }
    }
}

impl Display for EventKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Index(index) => write!(f, "{index}"),
            Self::Slice(range) => write!(f, "{}..{}", range.start, range.end),
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Key(key) => write!(f, "{key}"),
        }
    }
}

impl From<usize> for EventKey {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl From<&str> for EventKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<DictKey> for EventKey {
    fn from(value: DictKey) -> Self {
        Self::Key(value)
    }
}

/// One change notification: `(source, fqname, kind, key)`.
///
/// The source node has already been mutated when the event is delivered, so
/// listeners may read it to patch or rebuild their view.
#[derive(Debug, Clone)]
pub struct Event {
    pub source: NodeRef,
    pub fqname: String,
    pub kind: EventKind,
    pub key: EventKey,
}

#[cfg(test)]
mod tests {
    use super::{EventKey, EventKind, EventKindParseError};
    use crate::model::value::DictKey;

    #[test]
    fn parses_every_event_name() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
    }

    #[test]
    fn rejects_blank_and_unknown_event_names() {
        assert_eq!("  ".parse::<EventKind>(), Err(EventKindParseError::Empty));
        assert_eq!(
            "Update".parse::<EventKind>(),
            Err(EventKindParseError::Unsupported("Update".to_string()))
        );
    }

    #[test]
    fn event_keys_serialize_and_display() {
        let json = serde_json::to_value(EventKey::Index(3)).unwrap();
        assert_eq!(json["index"], 3);
        let json = serde_json::to_value(EventKind::Reset).unwrap();
        assert_eq!(json, "reset");

        assert_eq!(EventKey::Slice(1..4).to_string(), "1..4");
        assert_eq!(EventKey::from(DictKey::from(12)).to_string(), "12");
        assert_eq!(EventKey::from("").as_text(), Some(""));
    }
}
