//! Production-tracking sample model.
//!
//! # Responsibility
//! - Mock the production server that answers process and operation queries.
//! - Keep the current product, its process, performed operations and the two
//!   selections in one hot object tree.
//!
//! # Invariants
//! - The server is deterministic so demo output is stable between runs.
//! - Selections are `-1` until the user picks a row.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use hotmodel_core::{
    HotError, HotList, HotObject, HotResult, LeafKind, PropertyValue, RecordShape, Value,
};
use std::sync::Arc;

const ACTS: [&str; 9] = [
    "Laser",
    "Automatic SMT placement",
    "Manual SMT placement",
    "AOI",
    "THT placement",
    "Optical inspection",
    "Selective soldering",
    "Wave",
    "Manual soldering",
];

const SMT_BOTH_SIDES: &[usize] = &[0, 1, 2, 3, 1, 3];
const SMT_AND_THT: &[usize] = &[0, 1, 3, 4, 7, 5, 8, 5];
const SMT_THT_SELECTIVE: &[usize] = &[0, 1, 3, 4, 6, 5];

/// Record shapes shared by the server and the model.
#[derive(Debug, Clone)]
pub struct Shapes {
    pub process_operation: Arc<RecordShape>,
    pub product_operation: Arc<RecordShape>,
}

impl Default for Shapes {
    fn default() -> Self {
        Self {
            process_operation: RecordShape::new("ProcessOperation", ["operation", "act"]),
            product_operation: RecordShape::new(
                "ProductOperation",
                ["operation", "tm", "workplace"],
            ),
        }
    }
}

/// Mock server answering process/operation questions for a product.
#[derive(Debug, Clone)]
pub struct Server {
    shapes: Shapes,
    op_done_rate: usize,
}

impl Server {
    pub fn new(shapes: Shapes, op_done_rate: usize) -> Self {
        Self {
            shapes,
            op_done_rate: op_done_rate.min(100),
        }
    }

    pub fn shapes(&self) -> &Shapes {
        &self.shapes
    }

    /// Process steps `(operation, act)` for an article.
    ///
    /// The routing depends on the last character of the article.
    pub fn get_process(&self, article: &str, _sn: i64) -> HotResult<Vec<Value>> {
        let acts = match article.chars().last() {
            Some('0'..='3') => SMT_BOTH_SIDES,
            Some('4'..='6') => SMT_AND_THT,
            _ => SMT_THT_SELECTIVE,
        };
        acts.iter()
            .enumerate()
            .map(|(step, act)| {
                self.shapes
                    .process_operation
                    .record([Value::from(step as i64 * 10), Value::from(ACTS[*act])])
                    .map(Value::from)
            })
            .collect()
    }

    /// Operations already performed on one serial number.
    ///
    /// Some steps are skipped according to `op_done_rate`; timestamps and
    /// workplaces are derived from the serial number.
    pub fn get_product_ops(&self, article: &str, sn: i64) -> HotResult<Vec<Value>> {
        let mut tm = base_time()? - TimeDelta::days(3 + sn.rem_euclid(3));
        let mut performed = Vec::new();
        for (index, step) in self.get_process(article, sn)?.into_iter().enumerate() {
            let roll = (sn.unsigned_abs() as usize * 31 + index * 17) % 100;
            if roll >= self.op_done_rate {
                continue;
            }
            let operation = step
                .as_record()
                .and_then(|record| record.get("operation"))
                .cloned()
                .ok_or_else(|| HotError::TypeMismatch {
                    expected: "process operation record".to_string(),
                    found: step.type_name(),
                })?;
            let workplace = 1 + (sn.unsigned_abs() as usize + index) % 5;
            performed.push(Value::from(self.shapes.product_operation.record([
                operation,
                Value::from(tm),
                Value::from(workplace as i64),
            ])?));
            tm += TimeDelta::seconds(600 + index as i64 * 900);
        }
        Ok(performed)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new(Shapes::default(), 90)
    }
}

fn base_time() -> HotResult<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|date| date.and_hms_opt(8, 0, 0))
        .ok_or_else(|| HotError::PrecondViolation("invalid demo base time".to_string()))
}

/// Hot model of the product currently shown.
pub struct ProductModel {
    root: HotObject,
    server: Server,
}

impl ProductModel {
    pub fn new(server: Server) -> HotResult<Self> {
        let root = HotObject::new();
        let shapes = server.shapes().clone();
        root.declare_value("article", LeafKind::Str, true, None)?;
        root.declare_value("sn", LeafKind::Int, true, None)?;
        root.declare_child("operations", HotList::typed(shapes.product_operation))?;
        root.declare_child("process", HotList::typed(shapes.process_operation))?;
        root.declare_value(
            "operation_selection",
            LeafKind::Int,
            false,
            Some(Value::from(-1)),
        )?;
        root.declare_value(
            "process_selection",
            LeafKind::Int,
            false,
            Some(Value::from(-1)),
        )?;
        Ok(Self { root, server })
    }

    pub fn root(&self) -> &HotObject {
        &self.root
    }

    pub fn shapes(&self) -> &Shapes {
        self.server.shapes()
    }

    pub fn process(&self) -> HotResult<HotList> {
        self.root.list("process")
    }

    pub fn operations(&self) -> HotResult<HotList> {
        self.root.list("operations")
    }

    /// Loads a product from the server and clears both selections.
    pub fn set_product(&self, article: &str, sn: i64) -> HotResult<()> {
        self.root.set("article", article)?;
        self.root.set("sn", sn)?;
        let process = self.server.get_process(article, sn)?;
        self.root
            .set_property("process", PropertyValue::Items(process))?;
        let operations = self.server.get_product_ops(article, sn)?;
        self.root
            .set_property("operations", PropertyValue::Items(operations))?;
        self.root.set("operation_selection", -1)?;
        self.root.set("process_selection", -1)
    }

    pub fn select_operation(&self, index: i64) -> HotResult<()> {
        self.select("operation_selection", index)
    }

    pub fn select_process_operation(&self, index: i64) -> HotResult<()> {
        self.select("process_selection", index)
    }

    fn select(&self, name: &str, index: i64) -> HotResult<()> {
        if self.root.get(name)?.and_then(|value| value.as_int()) == Some(index) {
            return Ok(());
        }
        self.root.set(name, index)?;
        self.root.fire_select(name);
        Ok(())
    }
}
