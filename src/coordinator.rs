//! Joins the RTT and throughput signals and republishes the quality status.
//!
//! The coordinator owns the scorer. Every update from the RTT estimator or the
//! throughput windower is scored immediately and pushed to subscribers; a
//! transport failure is pushed once as a terminal event, after which the
//! coordinator stops.
//!
//! 汇合 RTT 与吞吐量信号并重新发布质量状态。协调器拥有评分器。

mod stream;

pub use stream::StatusStream;
pub(crate) use stream::StatusEvent;

use crate::config::{
    ScorerConfig, validate_base_throughput_weight, validate_positive, validate_time_constant,
};
use crate::error::{Error, Result, TransportError};
use crate::scorer::QualityScorer;
use crate::status::NetworkQualityStatus;
use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::Instant,
};
use tracing::{debug, info, trace, warn};

/// A new reading from one of the estimators.
///
/// 来自某个估算器的新读数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum QualityUpdate {
    /// The new smoothed RTT, in milliseconds.
    Rtt(f64),
    /// A new throughput sample, in bytes per second.
    Throughput(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ParamChange {
    TimeConstant(Duration),
    ThroughputReference(f64),
    RttReference(f64),
    BaseThroughputWeight(f64),
}

#[derive(Debug)]
pub(crate) enum CoordinatorCommand {
    Fail(TransportError),
    SetParam(ParamChange),
    CurrentStatus {
        response_tx: oneshot::Sender<NetworkQualityStatus>,
    },
    Params {
        response_tx: oneshot::Sender<ScorerConfig>,
    },
}

/// Handle to the coordinator task.
///
/// 协调器任务的句柄。
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    command_tx: mpsc::UnboundedSender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    /// Ends the status stream with a transport failure.
    ///
    /// 以传输失败结束状态流。
    pub fn fail(&self, error: TransportError) -> Result<()> {
        self.send(CoordinatorCommand::Fail(error))
    }

    pub fn set_time_constant(&self, time_constant: Duration) -> Result<()> {
        validate_time_constant(time_constant)?;
        self.send(CoordinatorCommand::SetParam(ParamChange::TimeConstant(
            time_constant,
        )))
    }

    pub fn set_throughput_reference(&self, bytes_per_sec: f64) -> Result<()> {
        validate_positive("throughput_reference_bps", bytes_per_sec)?;
        self.send(CoordinatorCommand::SetParam(
            ParamChange::ThroughputReference(bytes_per_sec),
        ))
    }

    pub fn set_rtt_reference(&self, rtt_ms: f64) -> Result<()> {
        validate_positive("rtt_reference_ms", rtt_ms)?;
        self.send(CoordinatorCommand::SetParam(ParamChange::RttReference(rtt_ms)))
    }

    pub fn set_base_throughput_weight(&self, weight: f64) -> Result<()> {
        validate_base_throughput_weight(weight)?;
        self.send(CoordinatorCommand::SetParam(
            ParamChange::BaseThroughputWeight(weight),
        ))
    }

    /// Scores the current readings now, without publishing the result.
    ///
    /// 立即对当前读数评分，但不发布结果。
    pub async fn current_status(&self) -> Result<NetworkQualityStatus> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(CoordinatorCommand::CurrentStatus { response_tx })?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }

    pub async fn params(&self) -> Result<ScorerConfig> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(CoordinatorCommand::Params { response_tx })?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }

    fn send(&self, command: CoordinatorCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ChannelClosed)
    }
}

struct CoordinatorTask {
    scorer: QualityScorer,
    command_rx: mpsc::UnboundedReceiver<CoordinatorCommand>,
    update_rx: mpsc::UnboundedReceiver<QualityUpdate>,
    status_tx: watch::Sender<Option<StatusEvent>>,
}

impl CoordinatorTask {
    async fn run(mut self) {
        info!(params = ?self.scorer.params(), "Quality coordinator task started");

        loop {
            // Updates first, so a query never overtakes readings queued before it.
            tokio::select! {
                biased;

                Some(update) = self.update_rx.recv() => self.apply_update(update),
                Some(command) = self.command_rx.recv() => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                else => break,
            }
        }

        info!("Quality coordinator task shutdown completed");
    }

    fn apply_update(&mut self, update: QualityUpdate) {
        let now = Instant::now();
        let status = match update {
            QualityUpdate::Rtt(rtt_ms) => self.scorer.update_rtt(rtt_ms, now),
            QualityUpdate::Throughput(bytes_per_sec) => {
                self.scorer.update_throughput(bytes_per_sec, now)
            }
        };
        trace!(?update, %status, "Quality status recomputed");
        self.status_tx
            .send_replace(Some(StatusEvent::Status(status)));
    }

    /// Returns `false` once the session has terminated.
    fn handle_command(&mut self, command: CoordinatorCommand) -> bool {
        match command {
            CoordinatorCommand::Fail(error) => {
                debug!(%error, "Transport failure, terminating status stream");
                self.status_tx
                    .send_replace(Some(StatusEvent::Failed(Error::Transport(error))));
                return false;
            }
            CoordinatorCommand::SetParam(change) => {
                let result = match change {
                    ParamChange::TimeConstant(value) => self.scorer.set_time_constant(value),
                    ParamChange::ThroughputReference(value) => {
                        self.scorer.set_throughput_reference(value)
                    }
                    ParamChange::RttReference(value) => self.scorer.set_rtt_reference(value),
                    ParamChange::BaseThroughputWeight(value) => {
                        self.scorer.set_base_throughput_weight(value)
                    }
                };
                match result {
                    Ok(()) => debug!(?change, "Scorer parameter updated"),
                    Err(err) => warn!(?change, error = %err, "Rejected scorer parameter"),
                }
            }
            CoordinatorCommand::CurrentStatus { response_tx } => {
                let _ = response_tx.send(self.scorer.status(Instant::now()));
            }
            CoordinatorCommand::Params { response_tx } => {
                let _ = response_tx.send(*self.scorer.params());
            }
        }
        true
    }
}

/// Spawns the coordinator, scoring everything that arrives on `update_rx`.
pub(crate) fn spawn_coordinator(
    params: ScorerConfig,
    update_rx: mpsc::UnboundedReceiver<QualityUpdate>,
) -> (CoordinatorHandle, watch::Receiver<Option<StatusEvent>>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(None);
    let task = CoordinatorTask {
        scorer: QualityScorer::new(params),
        command_rx,
        update_rx,
        status_tx,
    };

    tokio::spawn(task.run());

    (CoordinatorHandle { command_tx }, status_rx)
}
