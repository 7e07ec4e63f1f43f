//! Windowed throughput sampling.
//! 窗口化吞吐量采样。

mod actor;
pub mod window;

pub(crate) use actor::spawn_throughput_windower;
pub use actor::ThroughputWindowerHandle;
pub use window::{CloseReason, ThroughputSample, ThroughputWindow, WindowSnapshot};
