//! 节点守护进程配置改写
//!
//! 链路建立阶段为每个节点累积发现目标地址；进入运行前对每个节点的配置模板
//! 按固定顺序做一次文本替换。

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::NodeId;
use tracing::{debug, warn};

/// 发现目标块的插入锚点
pub const DISCOVERY_ANCHOR: &str = "# [discovery_destinations]\n";

/// 配置覆盖值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchOpts {
    /// 收敛层
    pub cla: String,
    /// 替换默认 epidemic 路由的策略
    pub routing_strategy: String,
    pub discovery_interval_ms: u64,
    pub janitor_interval_ms: u64,
}

impl Default for PatchOpts {
    fn default() -> Self {
        Self {
            cla: "udp".to_string(),
            routing_strategy: "external".to_string(),
            discovery_interval_ms: 500,
            janitor_interval_ms: 2500,
        }
    }
}

#[derive(Debug)]
pub struct ConfigPatcher {
    opts: PatchOpts,
    pending: BTreeMap<NodeId, Vec<String>>,
    finalized: BTreeSet<NodeId>,
}

impl ConfigPatcher {
    pub fn new(opts: PatchOpts) -> Self {
        Self {
            opts,
            pending: BTreeMap::new(),
            finalized: BTreeSet::new(),
        }
    }

    /// 为节点追加一个发现目标地址
    pub fn accumulate(&mut self, node: NodeId, address: impl Into<String>) -> Result<()> {
        if self.finalized.contains(&node) {
            return Err(Error::invariant(format!(
                "discovery address added to node {node} after its config was finalized"
            )));
        }
        self.pending.entry(node).or_default().push(address.into());
        Ok(())
    }

    /// 已为节点累积的发现目标
    pub fn addresses(&self, node: NodeId) -> &[String] {
        self.pending.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 对节点模板做替换，每个节点只能调用一次
    pub fn finalize(&mut self, node: NodeId, template: &str) -> Result<String> {
        if !self.finalized.insert(node) {
            return Err(Error::invariant(format!(
                "config of node {node} finalized twice"
            )));
        }

        let mut text = template.to_string();
        for (find, replace) in self.substitutions() {
            if text.contains(find) {
                text = text.replacen(find, &replace, 1);
            } else {
                warn!(node = %node, pattern = find, "配置模板中未找到替换目标");
            }
        }

        let block = self.discovery_block(node);
        if text.contains(DISCOVERY_ANCHOR) {
            text = text.replacen(DISCOVERY_ANCHOR, &block, 1);
        } else {
            warn!(node = %node, "配置模板中未找到发现目标锚点");
        }

        debug!(node = %node, targets = self.addresses(node).len(), "节点配置已改写");
        Ok(text)
    }

    fn substitutions(&self) -> [(&'static str, String); 4] {
        let o = &self.opts;
        [
            (r#"cla.0.id = "mtcp""#, format!(r#"cla.0.id = "{}""#, o.cla)),
            (
                r#"strategy = "epidemic""#,
                format!(r#"strategy = "{}""#, o.routing_strategy),
            ),
            (
                r#"interval = "2s""#,
                format!(r#"interval = "{}ms""#, o.discovery_interval_ms),
            ),
            (
                r#"janitor = "10s""#,
                format!(r#"janitor = "{}ms""#, o.janitor_interval_ms),
            ),
        ]
    }

    fn discovery_block(&self, node: NodeId) -> String {
        let mut block = String::from("[discovery_destinations]\n");
        for (idx, address) in self.addresses(node).iter().enumerate() {
            block.push_str(&format!("target.{idx}.destination = \"{address}\"\n"));
        }
        block
    }
}
