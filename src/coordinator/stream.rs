//! The subscriber side of the status broadcast.
//!
//! 状态广播的订阅端。

use crate::error::{Error, Result};
use crate::status::NetworkQualityStatus;
use tokio::sync::watch;

/// What the coordinator last published.
#[derive(Debug, Clone)]
pub(crate) enum StatusEvent {
    Status(NetworkQualityStatus),
    Failed(Error),
}

/// A stream of quality classifications, ending after a transport failure.
///
/// Only the most recent status is retained: a status that was superseded
/// before the subscriber polled is skipped.
///
/// 质量分类流，在传输失败后结束。只保留最新的状态。
#[derive(Debug, Clone)]
pub struct StatusStream {
    rx: watch::Receiver<Option<StatusEvent>>,
    finished: bool,
}

impl StatusStream {
    pub(crate) fn new(rx: watch::Receiver<Option<StatusEvent>>) -> Self {
        Self {
            rx,
            finished: false,
        }
    }

    /// Waits for the next status.
    ///
    /// Returns `Some(Err(_))` once for a terminal failure and `None` afterwards,
    /// or when the engine has shut down.
    ///
    /// 等待下一个状态。终止失败时返回一次 `Some(Err(_))`，之后返回 `None`。
    pub async fn next(&mut self) -> Option<Result<NetworkQualityStatus>> {
        if self.finished {
            return None;
        }

        loop {
            if self.rx.changed().await.is_err() {
                self.finished = true;
                return None;
            }

            let event = self.rx.borrow_and_update().clone();
            match event {
                Some(StatusEvent::Status(status)) => return Some(Ok(status)),
                Some(StatusEvent::Failed(err)) => {
                    self.finished = true;
                    return Some(Err(err));
                }
                None => continue,
            }
        }
    }

    /// The most recently published status, without waiting.
    ///
    /// 最近发布的状态，不等待。
    pub fn latest(&self) -> Option<NetworkQualityStatus> {
        match &*self.rx.borrow() {
            Some(StatusEvent::Status(status)) => Some(*status),
            _ => None,
        }
    }

    /// Whether a terminal failure has been published.
    pub fn is_terminated(&self) -> bool {
        matches!(&*self.rx.borrow(), Some(StatusEvent::Failed(_)))
    }
}
