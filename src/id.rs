//! 标识符类型
//!
//! 定义拓扑侧的节点、会话、接口、子网标识符，以及单调递增的 id 计数器。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 拓扑节点标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// 会话标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u32);

/// 节点上的接口序号（每个节点从 0 开始稠密编号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IfaceId(pub u32);

/// 链路子网编号（地址的第三个八位组）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubnetId(pub u8);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 单调递增的 id 生成器，只暴露 `next`。
#[derive(Debug, Clone, Default)]
pub struct IdCounter {
    next: u32,
}

impl IdCounter {
    pub fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    /// 下一次 `next` 将返回的值
    pub fn peek(&self) -> u32 {
        self.next
    }

    pub fn next(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}
