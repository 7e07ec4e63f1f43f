//! 定义了质量估计引擎的可配置参数。
//! Defines configurable parameters for the quality estimation engine.

use crate::error::{Error, Result};
use std::time::Duration;

/// The hard upper bound on how long a throughput window may stay open.
///
/// Fixed; not exposed through [`ThroughputConfig`].
///
/// 吞吐量窗口保持打开的最长时间。
pub const WINDOW_TIMEOUT: Duration = Duration::from_secs(10);

/// A structure containing all configurable parameters of the engine.
///
/// 包含引擎所有可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Composite scoring parameters.
    /// 综合评分参数。
    pub scorer: ScorerConfig,

    /// RTT smoothing parameters.
    /// RTT 平滑参数。
    pub rtt: RttConfig,

    /// Throughput window heuristics.
    /// 吞吐量窗口启发式参数。
    pub throughput: ThroughputConfig,
}

/// Parameters of the composite quality score.
///
/// 综合质量评分的参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorerConfig {
    /// How long it takes for a throughput sample's weight to decay to zero.
    /// 吞吐量样本权重衰减到零所需的时间。
    pub time_constant: Duration,
    /// Baseline "good" throughput, in bytes per second.
    /// 基准"良好"吞吐量（字节/秒）。
    pub throughput_reference_bps: f64,
    /// Baseline "good" round-trip time, in milliseconds.
    /// 基准"良好"往返时间（毫秒）。
    pub rtt_reference_ms: f64,
    /// The maximum share of the composite score contributed by throughput.
    /// 吞吐量在综合评分中的最大占比。
    pub base_throughput_weight: f64,
}

/// Parameters of the RTT estimator.
///
/// RTT 估算器的参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttConfig {
    /// EWMA weight given to each new sample.
    /// 每个新样本的 EWMA 权重。
    pub weight: f64,
}

/// Heuristics controlling when throughput windows open and emit samples.
///
/// 控制吞吐量窗口何时打开并产生样本的启发式参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputConfig {
    /// A closing window must have accumulated more than this many bytes to emit a sample.
    /// 关闭的窗口必须累计超过此字节数才能产生样本。
    pub min_total_bytes: u64,
    /// A response whose content length exceeds this opens a window.
    /// 内容长度超过此值的响应会打开一个窗口。
    pub min_window_size_bytes: u64,
    /// More concurrent requests than this opens a window; fewer closes it.
    /// 并发请求数超过此值会打开窗口；低于此值会关闭窗口。
    pub concurrency_threshold: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            time_constant: Duration::from_secs(60),
            throughput_reference_bps: 100_000_000.0, // 100 MB/s
            rtt_reference_ms: 50.0,
            base_throughput_weight: 0.6,
        }
    }
}

impl Default for RttConfig {
    fn default() -> Self {
        Self { weight: 0.125 }
    }
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            min_total_bytes: 32_000,           // 32 KB
            min_window_size_bytes: 5_000_000, // 5 MB
            concurrency_threshold: 5,
        }
    }
}

impl Config {
    /// Checks every parameter against its valid range.
    ///
    /// 检查每个参数是否在有效范围内。
    pub fn validate(&self) -> Result<()> {
        self.scorer.validate()?;
        self.rtt.validate()?;
        self.throughput.validate()
    }
}

impl ScorerConfig {
    pub fn validate(&self) -> Result<()> {
        validate_time_constant(self.time_constant)?;
        validate_positive("throughput_reference_bps", self.throughput_reference_bps)?;
        validate_positive("rtt_reference_ms", self.rtt_reference_ms)?;
        validate_base_throughput_weight(self.base_throughput_weight)
    }
}

impl RttConfig {
    pub fn validate(&self) -> Result<()> {
        validate_rtt_weight(self.weight)
    }
}

impl ThroughputConfig {
    pub fn validate(&self) -> Result<()> {
        validate_concurrency_threshold(self.concurrency_threshold)
    }
}

pub(crate) fn validate_time_constant(time_constant: Duration) -> Result<()> {
    if time_constant.is_zero() {
        return Err(Error::invalid("time_constant", "must be greater than zero"));
    }
    Ok(())
}

pub(crate) fn validate_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::invalid(name, format!("must be a positive finite number, got {value}")));
    }
    Ok(())
}

pub(crate) fn validate_base_throughput_weight(weight: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&weight) {
        return Err(Error::invalid(
            "base_throughput_weight",
            format!("must be within [0, 1], got {weight}"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_rtt_weight(weight: f64) -> Result<()> {
    if !(weight > 0.0 && weight <= 1.0) {
        return Err(Error::invalid("weight", format!("must be within (0, 1], got {weight}")));
    }
    Ok(())
}

pub(crate) fn validate_concurrency_threshold(threshold: usize) -> Result<()> {
    if threshold == 0 {
        return Err(Error::invalid("concurrency_threshold", "must be at least 1"));
    }
    Ok(())
}
