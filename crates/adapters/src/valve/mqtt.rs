// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MQTT valve transport
//!
//! Commands publish `"1"`/`"0"` to the configured set topic with the
//! channel substituted for `{channel}`. Hardware state arrives on the state
//! subscription (`sprinkler/+/get`) and is forwarded as [`ChannelReport`]s.

use super::{ChannelReport, TransportError, ValveCommand, ValveTransport};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use spk_core::config::MqttConfig;
use std::time::Duration;
use tokio::sync::mpsc;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const CHANNEL_CAPACITY: usize = 64;

/// Valve transport backed by an MQTT broker
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    qos: QoS,
    set_topic: String,
}

impl MqttTransport {
    /// Create the client and spawn its event loop on the current runtime.
    ///
    /// State confirmations are delivered on the returned receiver. Dropping
    /// the receiver only discards confirmations.
    pub fn start(config: &MqttConfig) -> (Self, mpsc::Receiver<ChannelReport>) {
        let client_id = format!("sprinkler-backend-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options.set_keep_alive(KEEP_ALIVE);
        if !config.username.is_empty() {
            options.set_credentials(config.username.clone(), config.password.clone());
        }

        let qos = qos_from(config.qos);
        let (client, eventloop) = AsyncClient::new(options, CHANNEL_CAPACITY);
        let (reports_tx, reports_rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(run_event_loop(
            eventloop,
            client.clone(),
            config.state_topic.clone(),
            qos,
            reports_tx,
        ));

        tracing::info!(host = %config.host, port = config.port, "mqtt transport started");

        (
            Self {
                client,
                qos,
                set_topic: config.set_topic.clone(),
            },
            reports_rx,
        )
    }

    fn topic_for(&self, channel: u32) -> String {
        self.set_topic.replace("{channel}", &channel.to_string())
    }
}

#[async_trait]
impl ValveTransport for MqttTransport {
    /// Queue the command without waiting; a full request queue (broker
    /// down) is reported as a publish error
    async fn set_channel(&self, channel: u32, command: ValveCommand) -> Result<(), TransportError> {
        self.client
            .try_publish(self.topic_for(channel), self.qos, false, command.payload())
            .map_err(|e| TransportError::Publish {
                channel,
                message: e.to_string(),
            })
    }
}

async fn run_event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    state_topic: String,
    qos: QoS,
    reports: mpsc::Sender<ChannelReport>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!(topic = %state_topic, "mqtt connected, subscribing");
                if let Err(e) = client.try_subscribe(state_topic.clone(), qos) {
                    tracing::warn!(error = %e, "state subscription failed");
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match parse_report(&state_topic, &publish.topic, &publish.payload) {
                    Some(report) => {
                        // Receiver gone means nobody wants confirmations
                        let _ = reports.send(report).await;
                    }
                    None => {
                        tracing::warn!(topic = %publish.topic, "state parse error");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "mqtt connection error, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

fn qos_from(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

/// Extract the channel from `topic` at the `+` position of `pattern`
pub fn channel_from_topic(pattern: &str, topic: &str) -> Option<u32> {
    let pattern: Vec<&str> = pattern.split('/').collect();
    let topic: Vec<&str> = topic.split('/').collect();
    if pattern.len() != topic.len() {
        return None;
    }

    let mut channel = None;
    for (p, t) in pattern.iter().zip(topic.iter()) {
        if *p == "+" {
            channel = Some(t.parse().ok()?);
        } else if p != t {
            return None;
        }
    }
    channel
}

/// Parse a state message into a report; `1`, `ON`, `on`, `true`, `True`
/// mean open and anything else closed
pub fn parse_report(pattern: &str, topic: &str, payload: &[u8]) -> Option<ChannelReport> {
    let channel = channel_from_topic(pattern, topic)?;
    let payload = std::str::from_utf8(payload).ok()?.trim();
    let open = matches!(payload, "1" | "ON" | "on" | "true" | "True");
    Some(ChannelReport { channel, open })
}

#[cfg(test)]
#[path = "mqtt_tests.rs"]
mod tests;
