//! 接口与地址分配
//!
//! 每个会承载链路的节点对分配一个独立子网 `<b0>.<b1>.<subnet>.0/24`，
//! 较小的节点拿 `.20`，较大的节点拿 `.21`。链路一旦分配就不会重新划分子网。

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::{IdCounter, IfaceId, NodeId, SubnetId};
use tracing::debug;

/// 拓扑侧的无序节点对，规范化为 (min, max)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodePair(NodeId, NodeId);

impl NodePair {
    pub fn new(x: NodeId, y: NodeId) -> NodePair {
        if x <= y { NodePair(x, y) } else { NodePair(y, x) }
    }

    pub fn low(&self) -> NodeId {
        self.0
    }

    pub fn high(&self) -> NodeId {
        self.1
    }
}

impl fmt::Display for NodePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// 链路层地址
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> String {
        mac.to_string()
    }
}

/// 节点上的一个接口
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub id: IfaceId,
    pub mac: MacAddr,
    pub ip4: Ipv4Addr,
    pub ip4_mask: u8,
}

/// 一条链路的地址分配结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkAllocation {
    pub subnet: SubnetId,
    /// 较小节点一侧的接口
    pub iface_a: Interface,
    /// 较大节点一侧的接口
    pub iface_b: Interface,
}

/// 地址块配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressingConfig {
    /// 地址前两个八位组
    pub block: [u8; 2],
    /// 子网总数上限（不超过 256）
    pub subnet_capacity: usize,
    pub host_a: u8,
    pub host_b: u8,
    pub prefix_len: u8,
}

impl Default for AddressingConfig {
    fn default() -> Self {
        Self {
            block: [10, 0],
            subnet_capacity: 255,
            host_a: 20,
            host_b: 21,
            prefix_len: 24,
        }
    }
}

/// 接口分配器：子网计数器全局共享，接口序号按节点各自从 0 递增。
#[derive(Debug)]
pub struct InterfaceAllocator {
    cfg: AddressingConfig,
    subnets: IdCounter,
    ifaces: HashMap<NodeId, IdCounter>,
    macs: IdCounter,
    table: HashMap<NodePair, LinkAllocation>,
}

impl InterfaceAllocator {
    pub fn new(cfg: AddressingConfig) -> Result<Self> {
        if cfg.subnet_capacity == 0 || cfg.subnet_capacity > 256 {
            return Err(Error::config(format!(
                "subnet_capacity must be in 1..=256, got {}",
                cfg.subnet_capacity
            )));
        }
        if cfg.host_a == cfg.host_b {
            return Err(Error::config("host_a and host_b must differ"));
        }
        if cfg.prefix_len > 32 {
            return Err(Error::config(format!(
                "prefix_len must be at most 32, got {}",
                cfg.prefix_len
            )));
        }
        Ok(Self {
            cfg,
            subnets: IdCounter::default(),
            ifaces: HashMap::new(),
            macs: IdCounter::default(),
            table: HashMap::new(),
        })
    }

    /// 为节点对分配链路；对同一节点对重复调用返回同一个结果，不消耗新子网。
    pub fn allocate(&mut self, pair: NodePair) -> Result<&LinkAllocation> {
        if self.table.contains_key(&pair) {
            return Ok(&self.table[&pair]);
        }

        let next = self.subnets.peek() as usize;
        if next >= self.cfg.subnet_capacity {
            return Err(Error::CapacityExceeded {
                capacity: self.cfg.subnet_capacity,
            });
        }
        let subnet = SubnetId(self.subnets.next() as u8);

        let iface_a = self.make_iface(pair.low(), subnet, self.cfg.host_a);
        let iface_b = self.make_iface(pair.high(), subnet, self.cfg.host_b);
        debug!(
            pair = %pair,
            subnet = subnet.0,
            ip_a = %iface_a.ip4,
            ip_b = %iface_b.ip4,
            "分配链路子网"
        );

        let alloc = LinkAllocation {
            subnet,
            iface_a,
            iface_b,
        };
        Ok(self.table.entry(pair).or_insert(alloc))
    }

    pub fn get(&self, pair: &NodePair) -> Option<&LinkAllocation> {
        self.table.get(pair)
    }

    /// 已分配的链路数
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn make_iface(&mut self, node: NodeId, subnet: SubnetId, host: u8) -> Interface {
        let id = IfaceId(self.ifaces.entry(node).or_default().next());
        let seq = self.macs.next().to_be_bytes();
        let [b0, b1] = self.cfg.block;
        Interface {
            id,
            mac: MacAddr([0x02, 0x00, seq[0], seq[1], seq[2], seq[3]]),
            ip4: Ipv4Addr::new(b0, b1, subnet.0, host),
            ip4_mask: self.cfg.prefix_len,
        }
    }
}
