//! 事件流节点名与拓扑节点 id 的双向映射

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::id::NodeId;

#[derive(Debug, Default)]
pub struct NodeMap {
    by_name: HashMap<String, NodeId>,
    by_id: BTreeMap<NodeId, String>,
}

impl NodeMap {
    pub fn insert(&mut self, name: &str, id: NodeId) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(Error::invariant(format!("node '{name}' declared twice")));
        }
        if let Some(existing) = self.by_id.get(&id) {
            return Err(Error::invariant(format!(
                "node id {id} already assigned to '{existing}'"
            )));
        }
        self.by_name.insert(name.to_string(), id);
        self.by_id.insert(id, name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// 解析边引用的节点名，未登记的节点是致命错误
    pub fn resolve(&self, name: &str, line: usize) -> Result<NodeId> {
        self.get(name).ok_or_else(|| {
            Error::invariant(format!(
                "edge at line {line} references undeclared node '{name}'"
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.by_id.keys().copied()
    }
}
