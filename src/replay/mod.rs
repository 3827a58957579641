//! 事件流回放模块
//!
//! 把解码后的事件流驱动到外部拓扑控制器上：节点创建、链路地址分配、
//! 守护进程配置改写，以及按 step 切换链路状态。

// 子模块声明
mod allocator;
mod config;
mod controller;
mod engine;
mod memory;
mod node_map;
mod pacer;
mod patcher;

// 重新导出公共接口
pub use allocator::{
    AddressingConfig, Interface, InterfaceAllocator, LinkAllocation, MacAddr, NodePair,
};
pub use config::{ControlNodeSpec, GridLayout, PacingMode, ReplayConfig};
pub use controller::{
    LINK_DOWN_LOSS, LINK_UP_LOSS, LinkEdit, LinkSpec, NodeSpec, Position, SessionState,
    TopologyController,
};
pub use engine::{Phase, ReplayEngine, ReplayReport};
pub use memory::{ControllerCall, MemLink, MemNode, MemSession, MemoryController};
pub use node_map::NodeMap;
pub use pacer::{InstantPacer, Pacer, RealtimePacer};
pub use patcher::{ConfigPatcher, DISCOVERY_ANCHOR, PatchOpts};
