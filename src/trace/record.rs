//! 接触记录类型
//!
//! 定义 trace 中的节点名、无序节点对和单条接触记录。

use std::fmt;

/// trace 本地的节点标识。
///
/// 整数按数值排序并排在具名节点之前；写入事件流时整数渲染为 `n<int>`。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeName {
    Num(u64),
    Name(String),
}

impl NodeName {
    pub fn parse(raw: &str) -> NodeName {
        match raw.parse::<u64>() {
            Ok(n) => NodeName::Num(n),
            Err(_) => NodeName::Name(raw.to_string()),
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeName::Num(n) => write!(f, "n{n}"),
            NodeName::Name(s) => f.write_str(s),
        }
    }
}

/// 无序节点对，规范化为 (min, max)。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pair {
    low: NodeName,
    high: NodeName,
}

impl Pair {
    pub fn new(x: NodeName, y: NodeName) -> Pair {
        if x <= y {
            Pair { low: x, high: y }
        } else {
            Pair { low: y, high: x }
        }
    }

    pub fn low(&self) -> &NodeName {
        &self.low
    }

    pub fn high(&self) -> &NodeName {
        &self.high
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}

/// 一条接触记录：`observer` 在 `[start, end]` 期间看到了 `observed`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub observer: NodeName,
    pub observed: NodeName,
    pub start: u64,
    pub end: u64,
}

impl ContactRecord {
    pub fn pair(&self) -> Pair {
        Pair::new(self.observer.clone(), self.observed.clone())
    }
}
