//! 接触图编译模块
//!
//! 读取接触 trace，并把逐对接触区间合并成有序的图事件流。

// 子模块声明
mod coalescer;
mod event;
mod reader;
mod record;

// 重新导出公共接口
pub use coalescer::{CoalesceOpts, DEFAULT_ZERO_DURATION_PAD, EventCoalescer, coalesce};
pub use event::{Event, EventStream, StepEvents};
pub use reader::{parse_contacts, read_contacts};
pub use record::{ContactRecord, NodeName, Pair};
