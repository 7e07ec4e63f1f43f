//! The task that owns the shared RTT estimate.
//!
//! All samples from concurrently completing requests are funneled through a
//! single command channel, so no update is lost and each one is published in
//! the order it was applied.
//!
//! 拥有共享 RTT 估计值的任务。所有并发完成请求的样本都通过单一命令通道汇集，
//! 因此不会丢失任何更新。

use super::{RequestTiming, RttEstimator};
use crate::config::{RttConfig, validate_rtt_weight};
use crate::coordinator::QualityUpdate;
use crate::error::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace};

#[derive(Debug)]
pub(crate) enum RttCommand {
    Record {
        duration_ms: f64,
    },
    SetWeight {
        weight: f64,
    },
    GetSmoothed {
        response_tx: oneshot::Sender<f64>,
    },
}

/// Handle to the RTT estimator task.
///
/// RTT 估算器任务的句柄。
#[derive(Debug, Clone)]
pub struct RttEstimatorHandle {
    command_tx: mpsc::UnboundedSender<RttCommand>,
}

impl RttEstimatorHandle {
    /// Records a round trip of `duration_ms` milliseconds. Never blocks.
    ///
    /// 记录一次耗时 `duration_ms` 毫秒的往返。从不阻塞。
    pub fn record_round_trip(&self, duration_ms: f64) -> Result<()> {
        self.send(RttCommand::Record { duration_ms })
    }

    /// Records the timing of a completed request; missing timestamps count as 0 ms.
    ///
    /// 记录已完成请求的时间信息；缺失的时间戳按 0 毫秒计。
    pub fn record_timing(&self, timing: RequestTiming) -> Result<()> {
        if timing.round_trip_ms().is_none() {
            debug!("Request completed without usable timing, recording a 0ms sample");
        }
        self.record_round_trip(timing.sample_ms())
    }

    pub fn set_weight(&self, weight: f64) -> Result<()> {
        validate_rtt_weight(weight)?;
        self.send(RttCommand::SetWeight { weight })
    }

    /// Returns the current smoothed RTT in milliseconds.
    ///
    /// 返回当前平滑后的 RTT（毫秒）。
    pub async fn smoothed_rtt(&self) -> Result<f64> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(RttCommand::GetSmoothed { response_tx })?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }

    fn send(&self, command: RttCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ChannelClosed)
    }
}

struct RttEstimatorTask {
    estimator: RttEstimator,
    command_rx: mpsc::UnboundedReceiver<RttCommand>,
    updates: mpsc::UnboundedSender<QualityUpdate>,
}

impl RttEstimatorTask {
    async fn run(mut self) {
        info!(weight = self.estimator.weight(), "RTT estimator task started");

        while let Some(command) = self.command_rx.recv().await {
            self.handle_command(command);
        }

        info!("RTT estimator task shutdown completed");
    }

    fn handle_command(&mut self, command: RttCommand) {
        match command {
            RttCommand::Record { duration_ms } => {
                let smoothed = self.estimator.record_round_trip(duration_ms);
                trace!(sample_ms = duration_ms, smoothed_ms = smoothed, "RTT sample recorded");
                if self.updates.send(QualityUpdate::Rtt(smoothed)).is_err() {
                    trace!("Coordinator is gone, RTT update not published");
                }
            }
            RttCommand::SetWeight { weight } => {
                debug!(weight, "RTT smoothing weight updated");
                self.estimator.set_weight(weight);
            }
            RttCommand::GetSmoothed { response_tx } => {
                let _ = response_tx.send(self.estimator.smoothed_rtt_ms());
            }
        }
    }
}

/// Spawns the RTT estimator task, publishing every new average to `updates`.
pub(crate) fn spawn_rtt_estimator(
    config: RttConfig,
    updates: mpsc::UnboundedSender<QualityUpdate>,
) -> RttEstimatorHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let task = RttEstimatorTask {
        estimator: RttEstimator::new(config),
        command_rx,
        updates,
    };

    tokio::spawn(task.run());

    RttEstimatorHandle { command_tx }
}
