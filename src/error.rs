//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use std::sync::Arc;
use thiserror::Error;

/// A failure reported by the transport that owns the observed requests.
///
/// The engine never inspects it; it is only carried to subscribers.
///
/// 由所观察请求的传输层报告的失败。
pub type TransportError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The primary error type for the network quality library.
/// 网络质量库的主要错误类型。
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// An in-flight request failed. This terminates the status stream.
    /// 一个进行中的请求失败。这会终止状态流。
    #[error("Transport failure: {0}")]
    Transport(TransportError),

    /// An internal channel for communication between tasks was closed unexpectedly.
    /// 用于任务间通信的内部通道意外关闭。
    #[error("Internal channel is broken")]
    ChannelClosed,

    /// A configuration value or setter argument is outside its valid range.
    /// 配置值或设置参数超出其有效范围。
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        match err {
            Error::Transport(e) => std::io::Error::other(e.to_string()),
            Error::ChannelClosed => ErrorKind::BrokenPipe.into(),
            Error::InvalidParameter { name, reason } => {
                std::io::Error::new(ErrorKind::InvalidInput, format!("{name}: {reason}"))
            }
        }
    }
}
