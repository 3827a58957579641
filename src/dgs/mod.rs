//! 事件流编解码模块
//!
//! 行式交换格式（GraphStream DGS 的子集）：
//!
//! ```text
//! DGS004
//! <graph-name> <step-count> <event-count>
//! st 0
//! an <node>
//! st <n>
//! ae <edge> <node-a> <node-b>
//! de <edge>
//! ```

// 子模块声明
mod decode;
mod encode;

/// 唯一支持的格式标签
pub const FORMAT_TAG: &str = "DGS004";

// 重新导出公共接口
pub use decode::{DgsDocument, DgsStep, EdgeOp, decode, read_dgs};
pub use encode::{EncodeStats, encode, encode_to_string};
