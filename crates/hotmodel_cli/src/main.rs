//! Demo entry point.
//!
//! # Responsibility
//! - Drive the production sample model through a typical session.
//! - Print every routed event as one JSON line so output is easy to diff.

mod production;

use hotmodel_core::{
    default_log_level, init_logging, Event, EventKey, EventKind, HotNode, ListenerResult,
    LogTarget, Mapper, Value, ANY_PATH,
};
use log::{error, info};
use production::{ProductModel, Server};
use serde::Serialize;
use std::error::Error;

#[derive(Serialize)]
struct RoutedEvent<'a> {
    handler: &'a str,
    fqname: &'a str,
    kind: EventKind,
    key: &'a EventKey,
}

fn printer(handler: &'static str) -> impl Fn(&Event) -> ListenerResult {
    move |event: &Event| -> ListenerResult {
        let line = serde_json::to_string(&RoutedEvent {
            handler,
            fqname: &event.fqname,
            kind: event.kind,
            key: &event.key,
        })?;
        println!("{line}");
        Ok(())
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let model = ProductModel::new(Server::default())?;

    let mapper = Mapper::new();
    mapper.add_route("/process", None, printer("process"));
    mapper.add_route(ANY_PATH, Some(EventKind::Reset), printer("any_reset"));
    mapper.add_route(ANY_PATH, None, printer("any"));
    model.root().add_listener(mapper)?;

    model.set_product("AAAQA1", 1)?;

    let first_step = model.process()?.get(0)?;
    let operation = first_step
        .as_record()
        .and_then(|record| record.get("operation"))
        .cloned()
        .ok_or("process step without operation")?;
    let tm = chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .ok_or("invalid timestamp")?;
    let manual = model
        .shapes()
        .product_operation
        .record([operation, Value::from(tm), Value::from(100)])?;
    model.operations()?.append(manual)?;

    model.set_product("AAAQA2", 2)?;
    model.select_operation(3)?;
    model.select_process_operation(1)?;
    model.select_process_operation(2)?;
    model.select_process_operation(2)?;

    info!(
        "event=demo_done module=cli status=ok listeners={}",
        model.root().listener_count()
    );
    Ok(())
}

fn main() {
    if let Err(err) = init_logging(default_log_level(), LogTarget::Stderr) {
        eprintln!("logging disabled: {err}");
    }
    info!(
        "event=demo_start module=cli status=ok core_version={}",
        hotmodel_core::core_version()
    );

    if let Err(err) = run() {
        error!("event=demo_failed module=cli status=error reason={err}");
        eprintln!("demo failed: {err}");
        std::process::exit(1);
    }
}
