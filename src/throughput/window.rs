//! The throughput window state machine.
//!
//! A window opens when enough requests are in flight or a large response is
//! announced, accumulates received bytes while open, and turns them into a
//! bytes-per-second sample when it closes. At most one window is open at a
//! time and every window closes no later than [`WINDOW_TIMEOUT`] after opening.
//!
//! 吞吐量窗口状态机。当并发请求足够多或宣告了大响应时打开窗口，打开期间累计接收的字节，
//! 关闭时将其转换为每秒字节数样本。

use crate::config::{ThroughputConfig, WINDOW_TIMEOUT};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open { opened_at: Instant, deadline: Instant },
}

/// Why a window was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Concurrency dropped below the threshold.
    ConcurrencyDropped,
    /// The window reached its timeout.
    Timeout,
    /// Closed on request.
    Explicit,
}

/// A throughput measurement produced by a closed window.
///
/// 已关闭窗口产生的吞吐量测量值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    pub bytes: u64,
    pub elapsed: Duration,
    pub bytes_per_sec: f64,
}

/// A point-in-time view of the window state.
///
/// 窗口状态的时间点视图。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub is_open: bool,
    pub opened_at: Option<Instant>,
    pub accumulated_bytes: u64,
    pub concurrent_requests: usize,
}

/// The windowed byte accumulator.
///
/// 窗口化的字节累加器。
#[derive(Debug)]
pub struct ThroughputWindow {
    state: State,
    accumulated_bytes: u64,
    concurrent_requests: usize,
    config: ThroughputConfig,
}

impl ThroughputWindow {
    pub fn new(config: ThroughputConfig) -> Self {
        Self {
            state: State::Closed,
            accumulated_bytes: 0,
            concurrent_requests: 0,
            config,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open { .. })
    }

    /// When the open window will time out, if one is open.
    ///
    /// 如果窗口已打开，返回其超时时间。
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            State::Open { deadline, .. } => Some(deadline),
            State::Closed => None,
        }
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        let opened_at = match self.state {
            State::Open { opened_at, .. } => Some(opened_at),
            State::Closed => None,
        };
        WindowSnapshot {
            is_open: self.is_open(),
            opened_at,
            accumulated_bytes: self.accumulated_bytes,
            concurrent_requests: self.concurrent_requests,
        }
    }

    pub fn config(&self) -> &ThroughputConfig {
        &self.config
    }

    pub fn set_min_total_bytes(&mut self, bytes: u64) {
        self.config.min_total_bytes = bytes;
    }

    pub fn set_min_window_size(&mut self, bytes: u64) {
        self.config.min_window_size_bytes = bytes;
    }

    pub fn set_concurrency_threshold(&mut self, threshold: usize) {
        self.config.concurrency_threshold = threshold;
    }

    /// A request entered flight. Opens the window once concurrency exceeds the threshold.
    ///
    /// 一个请求开始。当并发数超过阈值时打开窗口。
    pub fn on_request_started(&mut self, now: Instant) {
        self.concurrent_requests += 1;
        trace!(concurrent = self.concurrent_requests, "Request started");
        self.open_if_concurrent(now);
    }

    /// A request left flight. Closes the window once concurrency drops below the threshold.
    ///
    /// 一个请求结束。当并发数低于阈值时关闭窗口。
    pub fn on_request_completed(&mut self, now: Instant) -> Option<ThroughputSample> {
        match self.concurrent_requests.checked_sub(1) {
            Some(remaining) => self.concurrent_requests = remaining,
            None => warn!("Request completion without a matching start, ignoring"),
        }
        trace!(concurrent = self.concurrent_requests, "Request completed");

        if self.concurrent_requests < self.config.concurrency_threshold {
            self.close(now, CloseReason::ConcurrencyDropped)
        } else {
            None
        }
    }

    /// A response announced its content length. Large responses open the window.
    ///
    /// 响应宣告了其内容长度。大响应会打开窗口。
    pub fn on_response_size_known(&mut self, content_length: u64, now: Instant) {
        if !self.is_open() && content_length > self.config.min_window_size_bytes {
            debug!(content_length, "Large response announced");
            self.open(now);
        }
    }

    /// Body bytes arrived. They are counted only while a window is open.
    ///
    /// When closed, the open conditions are re-evaluated but the bytes of this
    /// call are not counted, even if it opens the window.
    ///
    /// 收到响应体字节。仅在窗口打开时计数。
    pub fn on_bytes_received(&mut self, bytes: u64, now: Instant) {
        if !self.is_open() {
            self.open_if_concurrent(now);
            return;
        }
        self.accumulated_bytes = self.accumulated_bytes.saturating_add(bytes);
        trace!(bytes, total = self.accumulated_bytes, "Bytes accumulated");
    }

    /// Closes the window if open, returning a sample when enough bytes were seen.
    ///
    /// 如果窗口已打开则关闭它，当累计字节足够时返回一个样本。
    pub fn close(&mut self, now: Instant, reason: CloseReason) -> Option<ThroughputSample> {
        let State::Open { opened_at, .. } = self.state else {
            return None;
        };
        self.state = State::Closed;
        let bytes = std::mem::take(&mut self.accumulated_bytes);
        let elapsed = now.saturating_duration_since(opened_at);

        if bytes <= self.config.min_total_bytes {
            debug!(?reason, bytes, "Window closed without enough bytes for a sample");
            return None;
        }
        if elapsed.is_zero() {
            debug!(?reason, bytes, "Window closed with zero elapsed time, discarding");
            return None;
        }

        let bytes_per_sec = bytes as f64 / elapsed.as_secs_f64();
        debug!(
            ?reason,
            bytes,
            elapsed_ms = elapsed.as_millis() as u64,
            bytes_per_sec,
            "Window closed with throughput sample"
        );
        Some(ThroughputSample {
            bytes,
            elapsed,
            bytes_per_sec,
        })
    }

    fn open_if_concurrent(&mut self, now: Instant) {
        if !self.is_open() && self.concurrent_requests > self.config.concurrency_threshold {
            self.open(now);
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = State::Open {
            opened_at: now,
            deadline: now + WINDOW_TIMEOUT,
        };
        debug!(concurrent = self.concurrent_requests, "Throughput window opened");
    }
}
