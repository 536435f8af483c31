//! Trigger lifecycle specs

use crate::prelude::*;
use spk_core::{DayFilter, DayOption, ProgramId, StartTime, Step};
use spk_storage::{TriggerStore, WalTriggerStore};
use std::sync::Arc;
use tempfile::TempDir;

fn morning() -> DayOption {
    DayOption::new("Everyday Morning", StartTime::new(6, 0).unwrap()).program("morning")
}

#[tokio::test(start_paused = true)]
async fn recurring_trigger_moves_to_next_day_after_firing() {
    let garden = Garden::new();
    garden.controller.register_recurring(morning()).unwrap();
    assert_eq!(garden.controller.triggers()[0].next_fire, june(10, 6, 0, 0));

    garden.clock.set(june(10, 6, 0, 1));
    garden.scheduler().dispatch_due();

    let triggers = garden.controller.triggers();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].next_fire, june(11, 6, 0, 0));
}

#[tokio::test(start_paused = true)]
async fn day_filter_skips_to_allowed_day() {
    let garden = Garden::new();
    // 2026-06-10 is a Wednesday
    let rule = morning().on("sat,sun".parse::<DayFilter>().unwrap());

    garden.controller.register_recurring(rule).unwrap();

    assert_eq!(garden.controller.triggers()[0].next_fire, june(13, 6, 0, 0));
}

#[tokio::test(start_paused = true)]
async fn registering_same_rule_twice_keeps_one_trigger() {
    let garden = Garden::new();

    let first = garden.controller.register_recurring(morning()).unwrap();
    let second = garden.controller.register_recurring(morning()).unwrap();

    assert_eq!(first, second);
    assert_eq!(garden.controller.triggers().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn one_off_run_fires_once() {
    let garden = Garden::new();
    let key = garden
        .controller
        .register_adhoc(None, Some(ProgramId::from("morning")), "Quick")
        .unwrap();
    assert!(key.is_adhoc());
    assert!(garden.scheduler().dispatch_due().is_empty());

    garden.clock.advance(std::time::Duration::from_secs(1));
    assert_eq!(garden.scheduler().dispatch_due(), vec![key]);
    assert!(garden.controller.triggers().is_empty());
    assert!(garden.scheduler().dispatch_due().is_empty());
}

#[tokio::test(start_paused = true)]
async fn one_off_run_needs_something_to_run() {
    let garden = Garden::new();

    assert!(garden.controller.register_adhoc(None, None, "empty").is_err());
    assert!(garden
        .controller
        .register_adhoc(Some(vec![Step::new(1, 5)]), None, "inline")
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn recurring_triggers_survive_restart() {
    let dir = TempDir::new().unwrap();
    let wal = dir.path().join("triggers.wal");

    {
        let garden = Garden::with_store(Arc::new(WalTriggerStore::open(&wal).unwrap()));
        garden.controller.register_recurring(morning()).unwrap();
        garden
            .controller
            .register_adhoc(Some(vec![Step::new(1, 5)]), None, "once")
            .unwrap();
    }

    let store = WalTriggerStore::open(&wal).unwrap();
    assert_eq!(store.list().len(), 1);

    let garden = Garden::with_store(Arc::new(store));
    assert_eq!(garden.scheduler().restore(), 1);
    let triggers = garden.controller.triggers();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].name, "Everyday Morning");
    assert_eq!(triggers[0].next_fire, june(10, 6, 0, 0));
}

#[tokio::test(start_paused = true)]
async fn removed_trigger_stays_removed() {
    let dir = TempDir::new().unwrap();
    let wal = dir.path().join("triggers.wal");
    let garden = Garden::with_store(Arc::new(WalTriggerStore::open(&wal).unwrap()));
    let key = garden.controller.register_recurring(morning()).unwrap();

    garden.controller.remove_trigger(&key).unwrap();

    assert!(garden.controller.remove_trigger(&key).is_err());
    assert!(WalTriggerStore::open(&wal).unwrap().list().is_empty());
}
