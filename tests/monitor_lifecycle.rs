//! End-to-end tests of the monitor: events in, statuses out.

mod common;

use common::harness::{FakeTransportError, start_monitor, start_monitor_with};
use latency_kit::{Config, Error, LatencyMonitor, QualityKind, RequestTiming};
use std::sync::Arc;
use tokio::time::{Duration, Instant, sleep};

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{} is not within {} of {}",
        actual,
        tolerance,
        expected
    );
}

fn timing_ms(ms: u64) -> RequestTiming {
    let start = Instant::now();
    RequestTiming::new(start, start + Duration::from_millis(ms))
}

/// Waits until every event sent so far has been applied and scored.
async fn settle(monitor: &LatencyMonitor) {
    monitor.smoothed_rtt().await.unwrap();
    monitor.window_snapshot().await.unwrap();
    monitor.current_status().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cold_start_status() {
    let (monitor, stream) = start_monitor();

    let status = monitor.current_status().await.unwrap();
    assert_eq!(status.kind(), QualityKind::Medium);
    assert_eq!(status.rtt_ms(), 50.0);
    assert_eq!(status.throughput_bytes_per_sec(), 1e8);

    // Nothing is published until a reading arrives.
    assert_eq!(stream.latest(), None);
    assert_eq!(monitor.smoothed_rtt().await.unwrap(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_rtt_samples_are_smoothed_and_published() {
    let (monitor, mut stream) = start_monitor();
    let samples = [80, 40, 120, 60];

    for ms in samples {
        monitor.request_timing_available(timing_ms(ms)).unwrap();
    }
    settle(&monitor).await;

    let expected = samples
        .iter()
        .fold(0.0, |s, &r| 0.875 * s + 0.125 * r as f64);
    assert_close(monitor.smoothed_rtt().await.unwrap(), expected, 1e-9);

    let status = stream.next().await.unwrap().unwrap();
    assert_close(status.rtt_ms(), expected, 1e-9);
    assert_eq!(stream.latest(), Some(status));
}

#[tokio::test(start_paused = true)]
async fn test_missing_timing_pulls_average_down() {
    let (monitor, _stream) = start_monitor();

    monitor.request_timing_available(timing_ms(80)).unwrap();
    monitor
        .request_timing_available(RequestTiming::unavailable())
        .unwrap();

    assert_close(monitor.smoothed_rtt().await.unwrap(), 0.875 * 10.0, 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_window_emits_throughput() {
    let (monitor, mut stream) = start_monitor();

    for _ in 0..5 {
        monitor.request_started().unwrap();
    }
    assert!(!monitor.window_snapshot().await.unwrap().is_open);

    monitor.request_started().unwrap();
    let snapshot = monitor.window_snapshot().await.unwrap();
    assert!(snapshot.is_open);
    assert_eq!(snapshot.concurrent_requests, 6);

    monitor.bytes_received(300_000).unwrap();
    sleep(Duration::from_secs(2)).await;

    // 6 -> 5 keeps the window open, 5 -> 4 closes it.
    monitor.request_completed(None).unwrap();
    assert!(monitor.window_snapshot().await.unwrap().is_open);
    monitor.request_completed(None).unwrap();

    let status = stream.next().await.unwrap().unwrap();
    assert_close(status.throughput_bytes_per_sec(), 150_000.0, 100.0);
    assert_eq!(status.rtt_ms(), 50.0);

    let snapshot = monitor.window_snapshot().await.unwrap();
    assert!(!snapshot.is_open);
    assert_eq!(snapshot.accumulated_bytes, 0);
    assert_eq!(snapshot.concurrent_requests, 4);
}

#[tokio::test(start_paused = true)]
async fn test_small_window_emits_nothing() {
    let (monitor, stream) = start_monitor();

    monitor.response_content_length_known(6_000_000).unwrap();
    monitor.bytes_received(31_999).unwrap();
    sleep(Duration::from_secs(1)).await;
    monitor.close_window().unwrap();
    settle(&monitor).await;

    assert!(!monitor.window_snapshot().await.unwrap().is_open);
    assert_eq!(stream.latest(), None);
}

#[tokio::test(start_paused = true)]
async fn test_large_window_emits_sample() {
    let (monitor, mut stream) = start_monitor();

    monitor.response_content_length_known(6_000_000).unwrap();
    monitor.bytes_received(32_001).unwrap();
    sleep(Duration::from_secs(1)).await;
    monitor.close_window().unwrap();

    let status = stream.next().await.unwrap().unwrap();
    assert_close(status.throughput_bytes_per_sec(), 32_001.0, 50.0);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_ends_every_stream() {
    let (monitor, mut stream) = start_monitor();
    monitor.request_timing_available(timing_ms(20)).unwrap();
    settle(&monitor).await;
    let mut late_subscriber = monitor.subscribe();

    monitor.request_started().unwrap();
    monitor
        .request_completed(Some(Arc::new(FakeTransportError("connection reset"))))
        .unwrap();

    let mut saw_failure = false;
    while let Some(item) = stream.next().await {
        if let Err(err) = item {
            assert!(matches!(err, Error::Transport(_)));
            assert_eq!(err.to_string(), "Transport failure: connection reset");
            saw_failure = true;
        }
    }
    assert!(saw_failure);
    assert!(stream.is_terminated());

    assert!(matches!(late_subscriber.next().await, Some(Err(Error::Transport(_)))));
    assert!(late_subscriber.next().await.is_none());

    // The session is over: scorer queries fail, events are ignored.
    assert!(matches!(
        monitor.current_status().await,
        Err(Error::ChannelClosed)
    ));
    monitor.request_timing_available(timing_ms(5)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_runtime_setters_take_effect() {
    let (monitor, _stream) = start_monitor();

    monitor.set_rtt_weight(1.0).unwrap();
    monitor.set_base_throughput_weight(0.0).unwrap();
    monitor.set_rtt_reference(100.0).unwrap();
    monitor.request_timing_available(timing_ms(10)).unwrap();
    settle(&monitor).await;

    // 1 - 20 / 100 = 0.8 with RTT alone.
    let status = monitor.current_status().await.unwrap();
    assert_eq!(status.kind(), QualityKind::Fast);
    assert_close(status.rtt_ms(), 10.0, 1e-9);

    monitor.set_min_window_size(100).unwrap();
    monitor.set_min_total_bytes(0).unwrap();
    monitor.response_content_length_known(101).unwrap();
    assert!(monitor.window_snapshot().await.unwrap().is_open);

    monitor.set_concurrency_threshold(1).unwrap();
    monitor.close_window().unwrap();
    monitor.request_started().unwrap();
    monitor.request_started().unwrap();
    assert!(monitor.window_snapshot().await.unwrap().is_open);

    assert!(matches!(
        monitor.set_concurrency_threshold(0),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(monitor.set_time_constant(Duration::ZERO).is_err());
    assert!(monitor.set_throughput_reference(f64::INFINITY).is_err());
    assert!(monitor.set_rtt_weight(-0.5).is_err());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = Config::default();
    config.scorer.base_throughput_weight = -0.1;
    assert!(matches!(
        LatencyMonitor::start(config),
        Err(Error::InvalidParameter { name: "base_throughput_weight", .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_config_overrides_are_applied_at_start() {
    let mut config = Config::default();
    config.scorer.rtt_reference_ms = 80.0;
    config.scorer.time_constant = Duration::from_secs(30);
    let (monitor, _stream) = start_monitor_with(config);

    let params = monitor.scorer_params().await.unwrap();
    assert_eq!(params.rtt_reference_ms, 80.0);
    assert_eq!(params.time_constant, Duration::from_secs(30));
    assert_eq!(monitor.current_status().await.unwrap().rtt_ms(), 80.0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_producers_lose_no_updates() {
    let (monitor, _stream) = start_monitor();

    let producers = (0..16).map(|_| {
        let monitor = monitor.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                monitor.request_started().unwrap();
                monitor.request_timing_available(timing_ms(40)).unwrap();
            }
        })
    });
    for result in futures::future::join_all(producers).await {
        result.unwrap();
    }

    let snapshot = monitor.window_snapshot().await.unwrap();
    assert_eq!(snapshot.concurrent_requests, 160);
    assert!(snapshot.is_open);

    let expected = (0..160).fold(0.0, |s, _| 0.875 * s + 0.125 * 40.0);
    assert_close(monitor.smoothed_rtt().await.unwrap(), expected, 1e-9);
}
