//! The entry point: wires the estimators to the coordinator.
//!
//! 入口：将估算器连接到协调器。

use crate::config::{Config, ScorerConfig};
use crate::coordinator::{CoordinatorHandle, StatusEvent, StatusStream, spawn_coordinator};
use crate::error::{Result, TransportError};
use crate::rtt::{RequestTiming, RttEstimatorHandle, spawn_rtt_estimator};
use crate::status::NetworkQualityStatus;
use crate::throughput::{ThroughputWindowerHandle, WindowSnapshot, spawn_throughput_windower};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// Passive network quality monitor.
///
/// Feed it the lifecycle events of in-flight requests and read the resulting
/// classification from a [`StatusStream`]. Cloning is cheap and every clone
/// shares the same state, so one instance per process is enough.
///
/// Must be started from within a Tokio runtime.
///
/// 被动网络质量监测器。输入进行中请求的生命周期事件，并从 [`StatusStream`] 读取分类结果。
#[derive(Debug, Clone)]
pub struct LatencyMonitor {
    rtt: RttEstimatorHandle,
    throughput: ThroughputWindowerHandle,
    coordinator: CoordinatorHandle,
    status_rx: watch::Receiver<Option<StatusEvent>>,
}

impl LatencyMonitor {
    /// Validates `config`, spawns the engine tasks and returns the monitor
    /// together with a first subscription.
    ///
    /// 验证 `config`，启动引擎任务，并返回监测器及第一个订阅。
    pub fn start(config: Config) -> Result<(Self, StatusStream)> {
        config.validate()?;

        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (coordinator, status_rx) = spawn_coordinator(config.scorer, update_rx);
        let rtt = spawn_rtt_estimator(config.rtt, update_tx.clone());
        let throughput = spawn_throughput_windower(config.throughput, update_tx);

        info!("Latency monitor started");

        let stream = StatusStream::new(status_rx.clone());
        let monitor = Self {
            rtt,
            throughput,
            coordinator,
            status_rx,
        };
        Ok((monitor, stream))
    }

    /// A new subscription. It immediately yields the latest status, if any.
    ///
    /// 新的订阅。如果已有状态，会立即产生最新状态。
    pub fn subscribe(&self) -> StatusStream {
        StatusStream::new(self.status_rx.clone())
    }

    pub fn request_started(&self) -> Result<()> {
        self.throughput.request_started()
    }

    /// A request finished. A failure ends every subscriber's status stream.
    ///
    /// 一个请求结束。失败会终止所有订阅者的状态流。
    pub fn request_completed(&self, error: Option<TransportError>) -> Result<()> {
        self.throughput.request_completed()?;
        match error {
            Some(error) => self.coordinator.fail(error),
            None => Ok(()),
        }
    }

    pub fn bytes_received(&self, bytes: u64) -> Result<()> {
        self.throughput.bytes_received(bytes)
    }

    pub fn response_content_length_known(&self, content_length: u64) -> Result<()> {
        self.throughput.response_size_known(content_length)
    }

    pub fn request_timing_available(&self, timing: RequestTiming) -> Result<()> {
        self.rtt.record_timing(timing)
    }

    pub fn close_window(&self) -> Result<()> {
        self.throughput.close_window()
    }

    pub fn set_rtt_weight(&self, weight: f64) -> Result<()> {
        self.rtt.set_weight(weight)
    }

    pub fn set_min_total_bytes(&self, bytes: u64) -> Result<()> {
        self.throughput.set_min_total_bytes(bytes)
    }

    pub fn set_min_window_size(&self, bytes: u64) -> Result<()> {
        self.throughput.set_min_window_size(bytes)
    }

    pub fn set_concurrency_threshold(&self, threshold: usize) -> Result<()> {
        self.throughput.set_concurrency_threshold(threshold)
    }

    pub fn set_time_constant(&self, time_constant: Duration) -> Result<()> {
        self.coordinator.set_time_constant(time_constant)
    }

    pub fn set_throughput_reference(&self, bytes_per_sec: f64) -> Result<()> {
        self.coordinator.set_throughput_reference(bytes_per_sec)
    }

    pub fn set_rtt_reference(&self, rtt_ms: f64) -> Result<()> {
        self.coordinator.set_rtt_reference(rtt_ms)
    }

    pub fn set_base_throughput_weight(&self, weight: f64) -> Result<()> {
        self.coordinator.set_base_throughput_weight(weight)
    }

    /// The raw smoothed RTT, zero before the first sample.
    pub async fn smoothed_rtt(&self) -> Result<f64> {
        self.rtt.smoothed_rtt().await
    }

    pub async fn window_snapshot(&self) -> Result<WindowSnapshot> {
        self.throughput.snapshot().await
    }

    pub async fn current_status(&self) -> Result<NetworkQualityStatus> {
        self.coordinator.current_status().await
    }

    pub async fn scorer_params(&self) -> Result<ScorerConfig> {
        self.coordinator.params().await
    }

    pub fn rtt_estimator(&self) -> &RttEstimatorHandle {
        &self.rtt
    }

    pub fn throughput_windower(&self) -> &ThroughputWindowerHandle {
        &self.throughput
    }

    pub fn coordinator(&self) -> &CoordinatorHandle {
        &self.coordinator
    }
}
