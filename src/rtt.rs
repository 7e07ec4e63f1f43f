//! An estimator for the round-trip time (RTT).
//! RTT 估算器。

mod actor;

pub use actor::RttEstimatorHandle;
pub(crate) use actor::spawn_rtt_estimator;

use crate::config::RttConfig;
use tokio::time::Instant;

/// Timestamps collected for one completed request.
///
/// Either timestamp may be missing when the transport could not measure it.
///
/// 为一个已完成请求收集的时间戳。当传输层无法测量时，任一时间戳都可能缺失。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestTiming {
    /// When the request started being sent.
    /// 请求开始发送的时间。
    pub request_start: Option<Instant>,
    /// When the first byte of the response arrived.
    /// 响应首字节到达的时间。
    pub response_start: Option<Instant>,
}

impl RequestTiming {
    pub fn new(request_start: Instant, response_start: Instant) -> Self {
        Self {
            request_start: Some(request_start),
            response_start: Some(response_start),
        }
    }

    /// A request that produced no usable timing information.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Time to first byte in milliseconds, if both ends were measured.
    ///
    /// A first byte recorded before the request start saturates to zero.
    ///
    /// 首字节时间（毫秒），仅当两端都被测量时返回。
    pub fn round_trip_ms(&self) -> Option<f64> {
        let start = self.request_start?;
        let first_byte = self.response_start?;
        Some(first_byte.saturating_duration_since(start).as_secs_f64() * 1000.0)
    }

    /// The sample fed to the estimator: missing timing counts as a 0 ms round trip.
    pub fn sample_ms(&self) -> f64 {
        self.round_trip_ms().unwrap_or(0.0)
    }
}

/// An exponentially weighted moving average over RTT samples.
///
/// The average starts at zero, so early values are biased low; consumers that
/// need a neutral cold-start value substitute their own reference.
///
/// 基于 RTT 样本的指数加权移动平均。均值从零开始，因此早期值偏低。
#[derive(Debug, Clone)]
pub struct RttEstimator {
    /// The smoothed round-trip time, in milliseconds.
    /// 平滑的往返时间（毫秒）。
    smoothed_rtt_ms: f64,
    /// The weight given to each new sample.
    /// 每个新样本的权重。
    weight: f64,
    samples: u64,
}

impl RttEstimator {
    pub fn new(config: RttConfig) -> Self {
        Self {
            smoothed_rtt_ms: 0.0,
            weight: config.weight,
            samples: 0,
        }
    }

    /// Returns the current smoothed RTT in milliseconds. Zero before any sample.
    ///
    /// 返回当前平滑后的 RTT（毫秒）。在任何样本之前为零。
    pub fn smoothed_rtt_ms(&self) -> f64 {
        self.smoothed_rtt_ms
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Number of samples folded in so far.
    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    /// Folds a new sample into the average and returns the updated value.
    ///
    /// 将一个新样本并入均值并返回更新后的值。
    pub fn record_round_trip(&mut self, duration_ms: f64) -> f64 {
        let sample = duration_ms.max(0.0);
        self.smoothed_rtt_ms = (1.0 - self.weight) * self.smoothed_rtt_ms + self.weight * sample;
        self.samples += 1;
        self.smoothed_rtt_ms
    }
}
