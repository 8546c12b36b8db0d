//! Immutable values carried by hot properties and containers.
//!
//! # Responsibility
//! - Define the closed set of leaf values and immutable shapes.
//! - Provide a canonical total order used by frozen sets.
//!
//! # Invariants
//! - Every `Value` is immutable once built; containers replace, never patch.
//! - `FrozenSet` members are sorted by `Value::canonical_cmp` and unique.
//! - A `Record` always holds exactly `shape.arity()` values.

use crate::error::{HotError, HotResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// Leaf classification of a `Value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafKind {
    Bool,
    Int,
    Float,
    Str,
    Date,
    Time,
    DateTime,
    Duration,
}

impl LeafKind {
    /// Stable lowercase name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Duration => "duration",
        }
    }
}

/// Immutable value accepted by hot properties, lists and dicts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Duration(Duration),
    /// Positional tuple of immutable members.
    Tuple(Vec<Value>),
    FrozenSet(FrozenSet),
    /// Tuple bound to a named field shape.
    Record(Record),
}

impl Value {
    /// Builds a tuple value from anything convertible to values.
    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Builds a frozen set value; duplicates collapse.
    pub fn frozen_set<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::FrozenSet(items.into_iter().map(Into::into).collect())
    }

    /// Returns the leaf kind, or `None` for tuples, sets and records.
    pub fn leaf_kind(&self) -> Option<LeafKind> {
        match self {
            Self::Bool(_) => Some(LeafKind::Bool),
            Self::Int(_) => Some(LeafKind::Int),
            Self::Float(_) => Some(LeafKind::Float),
            Self::Str(_) => Some(LeafKind::Str),
            Self::Date(_) => Some(LeafKind::Date),
            Self::Time(_) => Some(LeafKind::Time),
            Self::DateTime(_) => Some(LeafKind::DateTime),
            Self::Duration(_) => Some(LeafKind::Duration),
            Self::Tuple(_) | Self::FrozenSet(_) | Self::Record(_) => None,
        }
    }

    /// Human-readable type name for diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Self::Tuple(items) => format!("tuple of {}", items.len()),
            Self::FrozenSet(_) => "frozenset".to_string(),
            Self::Record(record) => format!("record `{}`", record.shape().name()),
            leaf => leaf
                .leaf_kind()
                .map(|kind| kind.as_str().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Total order across all values: by variant first, then by content.
    ///
    /// Floats compare with `f64::total_cmp`.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (Self::Duration(a), Self::Duration(b)) => a.cmp(b),
            (Self::Tuple(a), Self::Tuple(b)) => cmp_values(a, b),
            (Self::FrozenSet(a), Self::FrozenSet(b)) => cmp_values(a.as_slice(), b.as_slice()),
            (Self::Record(a), Self::Record(b)) => a
                .shape()
                .name()
                .cmp(b.shape().name())
                .then_with(|| cmp_values(a.values(), b.values())),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::Float(_) => 2,
            Self::Str(_) => 3,
            Self::Date(_) => 4,
            Self::Time(_) => 5,
            Self::DateTime(_) => 6,
            Self::Duration(_) => 7,
            Self::Tuple(_) => 8,
            Self::FrozenSet(_) => 9,
            Self::Record(_) => 10,
        }
    }
}

fn cmp_values(left: &[Value], right: &[Value]) -> Ordering {
    for (a, b) in left.iter().zip(right) {
        let ordering = a.canonical_cmp(b);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len())
}

fn write_joined(f: &mut Formatter<'_>, items: &[Value]) -> std::fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{value}"),
            Self::Time(value) => write!(f, "{value}"),
            Self::DateTime(value) => write!(f, "{value}"),
            Self::Duration(value) => write!(f, "{value:?}"),
            Self::Tuple(items) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                write!(f, ")")
            }
            Self::FrozenSet(set) => {
                write!(f, "frozenset({{")?;
                write_joined(f, set.as_slice())?;
                write!(f, "}})")
            }
            Self::Record(record) => {
                write!(f, "{}(", record.shape().name())?;
                write_joined(f, record.values())?;
                write!(f, ")")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl From<FrozenSet> for Value {
    fn from(value: FrozenSet) -> Self {
        Self::FrozenSet(value)
    }
}

/// Unordered, duplicate-free collection of immutable values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrozenSet(Vec<Value>);

impl FrozenSet {
    pub fn new(items: impl IntoIterator<Item = Value>) -> Self {
        let mut members: Vec<Value> = items.into_iter().collect();
        members.sort_by(Value::canonical_cmp);
        members.dedup_by(|a, b| a.canonical_cmp(b) == Ordering::Equal);
        Self(members)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0
            .binary_search_by(|member| member.canonical_cmp(value))
            .is_ok()
    }

    /// Members in canonical order.
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl FromIterator<Value> for FrozenSet {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Named field layout shared by records, e.g. `ProductOperation(operation, tm, workplace)`.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RecordShape {
    name: String,
    fields: Vec<String>,
}

impl RecordShape {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|candidate| candidate == field)
    }

    /// Binds positional values to this shape.
    ///
    /// # Errors
    /// - `TypeMismatch` when the value count differs from the field count.
    pub fn record<I, V>(self: &Arc<Self>, values: I) -> HotResult<Record>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.len() != self.arity() {
            return Err(HotError::mismatch(
                format!("record `{}` with {} fields", self.name, self.arity()),
                format!("{} values", values.len()),
            ));
        }
        Ok(Record {
            shape: Arc::clone(self),
            values,
        })
    }
}

/// Values bound to a `RecordShape`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    shape: Arc<RecordShape>,
    values: Vec<Value>,
}

impl Record {
    pub fn shape(&self) -> &Arc<RecordShape> {
        &self.shape
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value stored under `field`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.shape
            .field_index(field)
            .and_then(|index| self.values.get(index))
    }

    pub fn at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in self.shape.fields.iter().zip(&self.values) {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// Key of a `HotDict` entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DictKey {
    Int(i64),
    Str(String),
}

impl Display for DictKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for DictKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for DictKey {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for DictKey {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for DictKey {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}
