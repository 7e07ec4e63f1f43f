//! The task that owns the shared throughput window.
//!
//! 拥有共享吞吐量窗口的任务。

use super::window::{CloseReason, ThroughputWindow, WindowSnapshot};
use crate::config::{ThroughputConfig, validate_concurrency_threshold};
use crate::coordinator::QualityUpdate;
use crate::error::{Error, Result};
use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, sleep_until},
};
use tracing::{debug, info, trace};

#[derive(Debug)]
pub(crate) enum WindowCommand {
    RequestStarted,
    RequestCompleted,
    ResponseSizeKnown(u64),
    BytesReceived(u64),
    CloseWindow,
    SetMinTotalBytes(u64),
    SetMinWindowSize(u64),
    SetConcurrencyThreshold(usize),
    Snapshot {
        response_tx: oneshot::Sender<WindowSnapshot>,
    },
}

/// Handle to the throughput windower task.
///
/// Event methods never block; they enqueue the event and return.
///
/// 吞吐量窗口任务的句柄。事件方法从不阻塞。
#[derive(Debug, Clone)]
pub struct ThroughputWindowerHandle {
    command_tx: mpsc::UnboundedSender<WindowCommand>,
}

impl ThroughputWindowerHandle {
    pub fn request_started(&self) -> Result<()> {
        self.send(WindowCommand::RequestStarted)
    }

    pub fn request_completed(&self) -> Result<()> {
        self.send(WindowCommand::RequestCompleted)
    }

    pub fn response_size_known(&self, content_length: u64) -> Result<()> {
        self.send(WindowCommand::ResponseSizeKnown(content_length))
    }

    pub fn bytes_received(&self, bytes: u64) -> Result<()> {
        self.send(WindowCommand::BytesReceived(bytes))
    }

    /// Closes the current window, if any, emitting a sample when it qualifies.
    ///
    /// 关闭当前窗口（如有），符合条件时产生样本。
    pub fn close_window(&self) -> Result<()> {
        self.send(WindowCommand::CloseWindow)
    }

    pub fn set_min_total_bytes(&self, bytes: u64) -> Result<()> {
        self.send(WindowCommand::SetMinTotalBytes(bytes))
    }

    pub fn set_min_window_size(&self, bytes: u64) -> Result<()> {
        self.send(WindowCommand::SetMinWindowSize(bytes))
    }

    pub fn set_concurrency_threshold(&self, threshold: usize) -> Result<()> {
        validate_concurrency_threshold(threshold)?;
        self.send(WindowCommand::SetConcurrencyThreshold(threshold))
    }

    pub async fn snapshot(&self) -> Result<WindowSnapshot> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(WindowCommand::Snapshot { response_tx })?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }

    fn send(&self, command: WindowCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ChannelClosed)
    }
}

struct ThroughputWindowerTask {
    window: ThroughputWindow,
    command_rx: mpsc::UnboundedReceiver<WindowCommand>,
    updates: mpsc::UnboundedSender<QualityUpdate>,
}

impl ThroughputWindowerTask {
    async fn run(mut self) {
        info!(config = ?self.window.config(), "Throughput windower task started");

        loop {
            // Re-read every iteration: opening installs a fresh deadline and
            // closing removes it, so a stale timeout can never fire.
            let deadline = self.window.deadline();

            tokio::select! {
                biased;

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    debug!("Throughput window timed out");
                    self.close(CloseReason::Timeout);
                }

                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        info!("Throughput windower task shutdown completed");
    }

    fn handle_command(&mut self, command: WindowCommand) {
        let now = Instant::now();
        match command {
            WindowCommand::RequestStarted => self.window.on_request_started(now),
            WindowCommand::RequestCompleted => {
                if let Some(sample) = self.window.on_request_completed(now) {
                    self.publish(sample.bytes_per_sec);
                }
            }
            WindowCommand::ResponseSizeKnown(length) => {
                self.window.on_response_size_known(length, now)
            }
            WindowCommand::BytesReceived(bytes) => self.window.on_bytes_received(bytes, now),
            WindowCommand::CloseWindow => self.close(CloseReason::Explicit),
            WindowCommand::SetMinTotalBytes(bytes) => {
                debug!(bytes, "Minimum total bytes updated");
                self.window.set_min_total_bytes(bytes);
            }
            WindowCommand::SetMinWindowSize(bytes) => {
                debug!(bytes, "Minimum window size updated");
                self.window.set_min_window_size(bytes);
            }
            WindowCommand::SetConcurrencyThreshold(threshold) => {
                debug!(threshold, "Concurrency threshold updated");
                self.window.set_concurrency_threshold(threshold);
            }
            WindowCommand::Snapshot { response_tx } => {
                let _ = response_tx.send(self.window.snapshot());
            }
        }
    }

    fn close(&mut self, reason: CloseReason) {
        if let Some(sample) = self.window.close(Instant::now(), reason) {
            self.publish(sample.bytes_per_sec);
        }
    }

    fn publish(&self, bytes_per_sec: f64) {
        if self
            .updates
            .send(QualityUpdate::Throughput(bytes_per_sec))
            .is_err()
        {
            trace!("Coordinator is gone, throughput update not published");
        }
    }
}

/// Spawns the throughput windower task, publishing every sample to `updates`.
pub(crate) fn spawn_throughput_windower(
    config: ThroughputConfig,
    updates: mpsc::UnboundedSender<QualityUpdate>,
) -> ThroughputWindowerHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let task = ThroughputWindowerTask {
        window: ThroughputWindow::new(config),
        command_rx,
        updates,
    };

    tokio::spawn(task.run());

    ThroughputWindowerHandle { command_tx }
}
