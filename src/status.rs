//! The network quality classification published to subscribers.
//! 发布给订阅者的网络质量分类。

use std::fmt;

/// Composite scores strictly above this are classified as fast.
pub const FAST_SCORE_THRESHOLD: f64 = 0.7;
/// Composite scores strictly above this (and not fast) are classified as medium.
pub const MEDIUM_SCORE_THRESHOLD: f64 = 0.3;

/// The discrete quality class, without the readings.
///
/// 离散的质量等级（不含读数）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityKind {
    Slow,
    Medium,
    Fast,
}

impl QualityKind {
    /// Maps a composite score to a class. Both thresholds are exclusive.
    ///
    /// 将综合评分映射为等级。两个阈值都是不包含的。
    pub fn from_score(score: f64) -> Self {
        if score > FAST_SCORE_THRESHOLD {
            QualityKind::Fast
        } else if score > MEDIUM_SCORE_THRESHOLD {
            QualityKind::Medium
        } else {
            QualityKind::Slow
        }
    }
}

impl fmt::Display for QualityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityKind::Slow => "slow",
            QualityKind::Medium => "medium",
            QualityKind::Fast => "fast",
        };
        f.write_str(name)
    }
}

/// A classified network quality reading.
///
/// Each variant carries the RTT and throughput values that produced it, after
/// defaults have been substituted for missing samples.
///
/// 一个已分类的网络质量读数。每个变体都携带产生它的 RTT 和吞吐量值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NetworkQualityStatus {
    Slow {
        rtt_ms: f64,
        throughput_bytes_per_sec: f64,
    },
    Medium {
        rtt_ms: f64,
        throughput_bytes_per_sec: f64,
    },
    Fast {
        rtt_ms: f64,
        throughput_bytes_per_sec: f64,
    },
}

impl NetworkQualityStatus {
    pub(crate) fn new(kind: QualityKind, rtt_ms: f64, throughput_bytes_per_sec: f64) -> Self {
        match kind {
            QualityKind::Slow => NetworkQualityStatus::Slow {
                rtt_ms,
                throughput_bytes_per_sec,
            },
            QualityKind::Medium => NetworkQualityStatus::Medium {
                rtt_ms,
                throughput_bytes_per_sec,
            },
            QualityKind::Fast => NetworkQualityStatus::Fast {
                rtt_ms,
                throughput_bytes_per_sec,
            },
        }
    }

    pub fn kind(&self) -> QualityKind {
        match self {
            NetworkQualityStatus::Slow { .. } => QualityKind::Slow,
            NetworkQualityStatus::Medium { .. } => QualityKind::Medium,
            NetworkQualityStatus::Fast { .. } => QualityKind::Fast,
        }
    }

    pub fn rtt_ms(&self) -> f64 {
        match *self {
            NetworkQualityStatus::Slow { rtt_ms, .. }
            | NetworkQualityStatus::Medium { rtt_ms, .. }
            | NetworkQualityStatus::Fast { rtt_ms, .. } => rtt_ms,
        }
    }

    pub fn throughput_bytes_per_sec(&self) -> f64 {
        match *self {
            NetworkQualityStatus::Slow {
                throughput_bytes_per_sec,
                ..
            }
            | NetworkQualityStatus::Medium {
                throughput_bytes_per_sec,
                ..
            }
            | NetworkQualityStatus::Fast {
                throughput_bytes_per_sec,
                ..
            } => throughput_bytes_per_sec,
        }
    }
}

impl fmt::Display for NetworkQualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (rtt: {:.1}ms, throughput: {:.0}B/s)",
            self.kind(),
            self.rtt_ms(),
            self.throughput_bytes_per_sec()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_exclusive() {
        assert_eq!(QualityKind::from_score(0.7), QualityKind::Medium);
        assert_eq!(QualityKind::from_score(0.700_001), QualityKind::Fast);
        assert_eq!(QualityKind::from_score(0.3), QualityKind::Slow);
        assert_eq!(QualityKind::from_score(0.300_001), QualityKind::Medium);
        assert_eq!(QualityKind::from_score(0.0), QualityKind::Slow);
        assert_eq!(QualityKind::from_score(1.0), QualityKind::Fast);
    }

    #[test]
    fn test_status_accessors() {
        let status = NetworkQualityStatus::new(QualityKind::Medium, 12.5, 4_000.0);
        assert_eq!(status.kind(), QualityKind::Medium);
        assert_eq!(status.rtt_ms(), 12.5);
        assert_eq!(status.throughput_bytes_per_sec(), 4_000.0);
        assert_eq!(status.to_string(), "medium (rtt: 12.5ms, throughput: 4000B/s)");
    }
}
