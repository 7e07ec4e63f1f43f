#![deny(clippy::expect_used, clippy::unwrap_used)]

//! Passive network quality estimation from in-flight request signals.
//! 基于进行中请求信号的被动网络质量估计。

pub mod config;
pub mod coordinator;
pub mod error;
pub mod monitor;
pub mod observer;
pub mod rtt;
pub mod scorer;
pub mod status;
pub mod throughput;

pub use config::Config;
pub use coordinator::StatusStream;
pub use error::{Error, Result, TransportError};
pub use monitor::LatencyMonitor;
pub use observer::{ObserverChain, TransportObserver};
pub use rtt::RequestTiming;
pub use status::{NetworkQualityStatus, QualityKind};
