//! Manual zone run specs

use crate::prelude::*;
use spk_adapters::ValveCommand;
use spk_core::{RunState, ZoneId};

#[tokio::test(start_paused = true)]
async fn manual_run_closes_after_its_duration() {
    let garden = Garden::new();

    let run = garden
        .controller
        .activate_zone(ZoneId(1), Some(15))
        .await
        .unwrap();
    elapse(5).await;
    assert!(garden.controller.zones()[0].on);

    assert_eq!(run.wait(None).await, RunState::Completed);
    similar_asserts::assert_eq!(
        garden.commands(),
        vec![(31, ValveCommand::Open), (31, ValveCommand::Close)]
    );
    assert!(!garden.controller.zones()[0].on);
}

#[tokio::test(start_paused = true)]
async fn oversized_request_is_held_to_failsafe() {
    let garden = Garden::new();

    let run = garden
        .controller
        .activate_zone(ZoneId(2), Some(86_400))
        .await
        .unwrap();

    assert_eq!(run.duration(), 600);
    elapse(601).await;
    assert!(run.is_finished());
    assert!(garden.transport.open_channels().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deactivate_cuts_a_run_short() {
    let garden = Garden::new();
    let run = garden
        .controller
        .activate_zone(ZoneId(3), Some(120))
        .await
        .unwrap();
    elapse(10).await;

    garden.controller.deactivate_zone(ZoneId(3)).await.unwrap();

    assert_eq!(run.state(), RunState::Terminated);
    assert!(garden.transport.open_channels().is_empty());
    elapse(200).await;
    assert_eq!(garden.transport.count(33, ValveCommand::Close), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_zone_is_rejected_without_commands() {
    let garden = Garden::new();

    assert!(garden
        .controller
        .activate_zone(ZoneId(42), Some(10))
        .await
        .is_err());
    assert!(garden.commands().is_empty());
}
