//! 错误类型
//!
//! 编译器与回放引擎共用的错误分类。所有错误对当前运行都是致命的，不做自动重试。

use thiserror::Error;

/// 本 crate 的 Result 别名。
pub type Result<T> = std::result::Result<T, Error>;

/// 编译/回放过程中可能出现的错误。
#[derive(Debug, Error)]
pub enum Error {
    /// 输入格式错误（不支持的格式标签、畸形的行）
    #[error("format error at line {line}: {msg}")]
    Format { line: usize, msg: String },

    /// 违反事件流或会话状态的不变量
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// 子网地址块耗尽
    #[error("capacity exceeded: cannot allocate more than {capacity} links")]
    CapacityExceeded { capacity: usize },

    /// 外部拓扑控制器调用失败
    #[error("controller error in {op}: {msg}")]
    Controller { op: &'static str, msg: String },

    /// 运行参数不合法
    #[error("invalid configuration: {0}")]
    Config(String),

    /// 运行期间收到外部中断
    #[error("replay cancelled before step {step}")]
    Cancelled { step: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn format(line: usize, msg: impl Into<String>) -> Self {
        Error::Format {
            line,
            msg: msg.into(),
        }
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Error::Invariant(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn controller(op: &'static str, msg: impl Into<String>) -> Self {
        Error::Controller {
            op,
            msg: msg.into(),
        }
    }
}
