//! tests/common/harness.rs
#![allow(dead_code)]

use latency_kit::{Config, LatencyMonitor, StatusStream};
use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "latency_kit=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::FULL)
            .with_test_writer()
            .init();
    });
}

/// Starts a monitor with the default configuration.
pub fn start_monitor() -> (LatencyMonitor, StatusStream) {
    start_monitor_with(Config::default())
}

pub fn start_monitor_with(config: Config) -> (LatencyMonitor, StatusStream) {
    init_tracing();
    LatencyMonitor::start(config).unwrap()
}

/// A minimal transport error for failure-path tests.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FakeTransportError(pub &'static str);
