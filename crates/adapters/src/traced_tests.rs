// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::valve::FakeTransport;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn traced_transport_logs_successful_send() {
    let fake = FakeTransport::new();
    let traced = TracedTransport::new(fake.clone());

    let (logs, result) = with_tracing(|| async move {
        traced.set_channel(31, ValveCommand::Open).await
    });

    assert!(result.is_ok());
    assert!(logs.contains("valve.set"), "missing span: {logs}");
    assert!(logs.contains("channel=31"), "missing channel field: {logs}");
    assert!(logs.contains("command=open"), "missing command field: {logs}");
    assert!(logs.contains("sent"), "missing completion line: {logs}");
    assert!(logs.contains("elapsed_ms"), "missing timing: {logs}");
    assert_eq!(fake.open_channels(), vec![31]);
}

#[test]
fn traced_transport_logs_failures() {
    let fake = FakeTransport::new();
    fake.fail_on(7, ValveCommand::Close);
    let traced = TracedTransport::new(fake);

    let (logs, result) = with_tracing(|| async move {
        traced.set_channel(7, ValveCommand::Close).await
    });

    assert!(result.is_err());
    assert!(logs.contains("ERROR"), "missing error level: {logs}");
    assert!(logs.contains("send failed"), "missing failure line: {logs}");
    assert!(logs.contains("injected failure"), "missing error text: {logs}");
}

#[tokio::test]
async fn traced_transport_delegates_to_inner() {
    let traced = TracedTransport::new(FakeTransport::new());

    traced.set_channel(2, ValveCommand::Open).await.unwrap();
    traced.set_channel(2, ValveCommand::Close).await.unwrap();

    assert_eq!(traced.inner().calls().len(), 2);
    assert!(traced.inner().open_channels().is_empty());
}
