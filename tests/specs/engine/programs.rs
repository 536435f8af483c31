//! Program execution specs
//!
//! A program runs its steps one zone at a time, in order, and always
//! leaves every valve closed.

use crate::prelude::*;
use spk_adapters::ValveCommand;
use spk_core::{DayOption, StartTime, Step};

#[tokio::test(start_paused = true)]
async fn scheduled_program_runs_zones_in_order() {
    let garden = Garden::new();
    let rule = DayOption::new("Everyday Morning", StartTime::new(6, 0).unwrap()).program("morning");
    garden.controller.register_recurring(rule).unwrap();

    garden.clock.set(june(10, 6, 0, 0));
    assert_eq!(garden.scheduler().dispatch_due().len(), 1);
    elapse(5).await;
    assert_eq!(garden.transport.open_channels(), vec![33]);

    elapse(60).await;
    similar_asserts::assert_eq!(
        garden.commands(),
        vec![
            (33, ValveCommand::Open),
            (33, ValveCommand::Close),
            (32, ValveCommand::Open),
            (32, ValveCommand::Close),
        ]
    );
    assert_eq!(garden.transport.max_concurrently_open(), 1);
    assert_eq!(garden.scheduler().running(), 0);
}

#[tokio::test(start_paused = true)]
async fn broken_valve_is_skipped() {
    let garden = Garden::new();
    garden.transport.fail_on(33, ValveCommand::Open);
    let rule = DayOption::new("Everyday Morning", StartTime::new(6, 0).unwrap()).program("morning");
    let key = garden.controller.register_recurring(rule).unwrap();

    garden.controller.trigger_now(&key).unwrap();
    garden.scheduler().dispatch_due();
    elapse(60).await;

    assert_eq!(garden.transport.count(32, ValveCommand::Open), 1);
    assert_eq!(garden.transport.count(32, ValveCommand::Close), 1);
    assert!(garden.transport.open_channels().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_mid_program_closes_everything() {
    let garden = Garden::new();
    garden
        .controller
        .register_adhoc(Some(vec![Step::new(1, 300), Step::new(2, 300)]), None, "soak")
        .unwrap();

    garden.clock.advance(std::time::Duration::from_secs(2));
    garden.scheduler().dispatch_due();
    elapse(30).await;
    assert_eq!(garden.transport.open_channels(), vec![31]);

    garden.controller.shutdown().await;
    elapse(600).await;

    assert!(garden.transport.open_channels().is_empty());
    assert_eq!(garden.transport.count(32, ValveCommand::Open), 0);
    assert!(garden.controller.zones().iter().all(|z| !z.on));
}
