//! The seam between an HTTP client and the monitor.
//!
//! A client adapter reports request lifecycle events to a [`TransportObserver`].
//! [`ObserverChain`] forwards each event to an ordered list of observers, so
//! the quality monitor can sit in front of any observer the application
//! already uses.
//!
//! HTTP 客户端与监测器之间的接口。客户端适配器将请求生命周期事件报告给 [`TransportObserver`]。

use crate::error::TransportError;
use crate::monitor::LatencyMonitor;
use crate::rtt::RequestTiming;
use bytes::Bytes;
use std::sync::Arc;
use tracing::warn;

/// Receiver of per-request lifecycle events.
///
/// Every method has a no-op default, so observers only implement what they
/// care about. Methods must not block.
///
/// 每个请求生命周期事件的接收者。所有方法都有空的默认实现。
pub trait TransportObserver: Send + Sync + 'static {
    /// A request was created and is about to be sent.
    ///
    /// 一个请求已创建并即将发送。
    fn request_started(&self) {}

    /// A request finished, successfully or not.
    ///
    /// 一个请求已结束（无论成功与否）。
    fn request_completed(&self, _error: Option<&TransportError>) {}

    /// A chunk of the response body arrived.
    ///
    /// 收到一块响应体数据。
    fn data_received(&self, _chunk: &Bytes) {}

    /// The response headers announced a content length.
    ///
    /// 响应头宣告了内容长度。
    fn response_content_length_known(&self, _content_length: u64) {}

    /// Timing metrics for a finished request are available.
    ///
    /// 已结束请求的时间指标可用。
    fn request_timing_available(&self, _timing: &RequestTiming) {}
}

impl TransportObserver for LatencyMonitor {
    fn request_started(&self) {
        if let Err(err) = LatencyMonitor::request_started(self) {
            warn!(error = %err, "Failed to record request start");
        }
    }

    fn request_completed(&self, error: Option<&TransportError>) {
        if let Err(err) = LatencyMonitor::request_completed(self, error.cloned()) {
            warn!(error = %err, "Failed to record request completion");
        }
    }

    fn data_received(&self, chunk: &Bytes) {
        if let Err(err) = self.bytes_received(chunk.len() as u64) {
            warn!(error = %err, "Failed to record received bytes");
        }
    }

    fn response_content_length_known(&self, content_length: u64) {
        if let Err(err) = LatencyMonitor::response_content_length_known(self, content_length) {
            warn!(error = %err, "Failed to record content length");
        }
    }

    fn request_timing_available(&self, timing: &RequestTiming) {
        if let Err(err) = LatencyMonitor::request_timing_available(self, *timing) {
            warn!(error = %err, "Failed to record request timing");
        }
    }
}

/// Dispatches every event to its observers in insertion order.
///
/// 按插入顺序将每个事件分发给其观察者。
#[derive(Clone, Default)]
pub struct ObserverChain {
    observers: Vec<Arc<dyn TransportObserver>>,
}

impl ObserverChain {
    /// A chain with the quality monitor first.
    ///
    /// 以质量监测器为首的观察者链。
    pub fn new(monitor: LatencyMonitor) -> Self {
        Self {
            observers: vec![Arc::new(monitor)],
        }
    }

    /// Appends a pass-through observer after the ones already present.
    ///
    /// 在已有观察者之后追加一个透传观察者。
    pub fn with(mut self, observer: Arc<dyn TransportObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverChain")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl TransportObserver for ObserverChain {
    fn request_started(&self) {
        self.observers.iter().for_each(|o| o.request_started());
    }

    fn request_completed(&self, error: Option<&TransportError>) {
        self.observers.iter().for_each(|o| o.request_completed(error));
    }

    fn data_received(&self, chunk: &Bytes) {
        self.observers.iter().for_each(|o| o.data_received(chunk));
    }

    fn response_content_length_known(&self, content_length: u64) {
        self.observers
            .iter()
            .for_each(|o| o.response_content_length_known(content_length));
    }

    fn request_timing_available(&self, timing: &RequestTiming) {
        self.observers
            .iter()
            .for_each(|o| o.request_timing_available(timing));
    }
}
