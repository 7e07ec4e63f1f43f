//! Fuses RTT and throughput readings into a single quality classification.
//!
//! The throughput reading loses confidence as it ages: its weight follows a
//! cosine ease-out from `base_throughput_weight` down to zero over
//! `time_constant`, after which the score depends on RTT alone.
//!
//! 将 RTT 与吞吐量读数融合为单一的质量分类。吞吐量读数随时间推移可信度下降。

use crate::config::{
    ScorerConfig, validate_base_throughput_weight, validate_positive, validate_time_constant,
};
use crate::error::Result;
use crate::status::{NetworkQualityStatus, QualityKind};
use std::f64::consts::FRAC_PI_2;
use std::time::Duration;
use tokio::time::Instant;

/// The latest readings the scorer works from. `None` means no sample yet.
///
/// 评分器所依据的最新读数。`None` 表示尚无样本。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Readings {
    pub rtt_ms: Option<f64>,
    pub throughput_bps: Option<f64>,
    pub throughput_sampled_at: Option<Instant>,
}

/// Every intermediate value of one score computation.
///
/// 一次评分计算的所有中间值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    /// RTT used, after substituting the reference for a missing sample.
    pub rtt_ms: f64,
    /// Throughput used, after substituting the reference for a missing sample.
    pub throughput_bps: f64,
    pub rtt_score: f64,
    pub throughput_score: f64,
    pub time_weight: f64,
    pub throughput_weight: f64,
    pub rtt_weight: f64,
    /// The fused score, always within [0, 1].
    pub composite: f64,
}

impl ScoreBreakdown {
    pub fn kind(&self) -> QualityKind {
        QualityKind::from_score(self.composite)
    }

    pub fn status(&self) -> NetworkQualityStatus {
        NetworkQualityStatus::new(self.kind(), self.rtt_ms, self.throughput_bps)
    }
}

/// Computes the full score breakdown for `readings` at `now`.
///
/// The `* 2` and `/ 5` scalings of the two sub-scores are tuning constants.
///
/// 计算 `readings` 在 `now` 时刻的完整评分明细。
pub fn score(readings: &Readings, now: Instant, params: &ScorerConfig) -> ScoreBreakdown {
    let rtt_ms = readings.rtt_ms.unwrap_or(params.rtt_reference_ms);
    let throughput_bps = readings
        .throughput_bps
        .unwrap_or(params.throughput_reference_bps);

    let rtt_score = (1.0 - (rtt_ms * 2.0) / params.rtt_reference_ms).clamp(0.0, 1.0);
    let throughput_score =
        (1.0 - (throughput_bps / 5.0) / params.throughput_reference_bps).clamp(0.0, 1.0);

    let elapsed = readings
        .throughput_sampled_at
        .map(|at| now.saturating_duration_since(at))
        .unwrap_or(Duration::ZERO);
    let time_weight = decay(elapsed, params.time_constant);
    let throughput_weight = params.base_throughput_weight * time_weight;
    let rtt_weight = 1.0 - throughput_weight;

    let composite = (rtt_weight * rtt_score + throughput_weight * throughput_score).clamp(0.0, 1.0);

    ScoreBreakdown {
        rtt_ms,
        throughput_bps,
        rtt_score,
        throughput_score,
        time_weight,
        throughput_weight,
        rtt_weight,
        composite,
    }
}

/// Classifies `readings` at `now`.
///
/// 对 `readings` 在 `now` 时刻进行分类。
pub fn calculate_status(
    readings: &Readings,
    now: Instant,
    params: &ScorerConfig,
) -> NetworkQualityStatus {
    score(readings, now, params).status()
}

/// Cosine ease-out from 1 at `elapsed == 0` to 0 at `elapsed >= time_constant`.
fn decay(elapsed: Duration, time_constant: Duration) -> f64 {
    let progress = elapsed.as_secs_f64() / time_constant.as_secs_f64();
    if progress >= 1.0 {
        // cos(pi/2) is not exactly zero in floating point.
        return 0.0;
    }
    (progress * FRAC_PI_2).cos().clamp(0.0, 1.0)
}

/// The stateful scorer: the latest readings plus the tunable parameters.
///
/// 有状态的评分器：最新读数加上可调参数。
#[derive(Debug, Clone)]
pub struct QualityScorer {
    readings: Readings,
    params: ScorerConfig,
}

impl QualityScorer {
    pub fn new(params: ScorerConfig) -> Self {
        Self {
            readings: Readings::default(),
            params,
        }
    }

    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    pub fn params(&self) -> &ScorerConfig {
        &self.params
    }

    pub fn update_rtt(&mut self, rtt_ms: f64, now: Instant) -> NetworkQualityStatus {
        self.readings.rtt_ms = Some(rtt_ms);
        self.status(now)
    }

    /// Stores a throughput sample, stamping it with `now` for the time decay.
    pub fn update_throughput(&mut self, bytes_per_sec: f64, now: Instant) -> NetworkQualityStatus {
        self.readings.throughput_bps = Some(bytes_per_sec);
        self.readings.throughput_sampled_at = Some(now);
        self.status(now)
    }

    pub fn status(&self, now: Instant) -> NetworkQualityStatus {
        calculate_status(&self.readings, now, &self.params)
    }

    pub fn set_time_constant(&mut self, time_constant: Duration) -> Result<()> {
        validate_time_constant(time_constant)?;
        self.params.time_constant = time_constant;
        Ok(())
    }

    pub fn set_throughput_reference(&mut self, bytes_per_sec: f64) -> Result<()> {
        validate_positive("throughput_reference_bps", bytes_per_sec)?;
        self.params.throughput_reference_bps = bytes_per_sec;
        Ok(())
    }

    pub fn set_rtt_reference(&mut self, rtt_ms: f64) -> Result<()> {
        validate_positive("rtt_reference_ms", rtt_ms)?;
        self.params.rtt_reference_ms = rtt_ms;
        Ok(())
    }

    pub fn set_base_throughput_weight(&mut self, weight: f64) -> Result<()> {
        validate_base_throughput_weight(weight)?;
        self.params.base_throughput_weight = weight;
        Ok(())
    }
}
