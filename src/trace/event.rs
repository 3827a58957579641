//! 图事件流类型

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::record::{NodeName, Pair};

/// 边事件
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    AddEdge(Pair),
    DeleteEdge(Pair),
}

impl Event {
    pub fn pair(&self) -> &Pair {
        match self {
            Event::AddEdge(p) | Event::DeleteEdge(p) => p,
        }
    }

    pub fn is_add(&self) -> bool {
        matches!(self, Event::AddEdge(_))
    }
}

/// 某个离散时间步上的全部事件（保持插入顺序）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvents {
    pub step: u64,
    pub events: Vec<Event>,
}

/// 合并后的事件流：按 step 升序。
///
/// 对每个 `Pair`，AddEdge/DeleteEdge 严格交替且以 AddEdge 开始。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStream {
    /// trace 中出现过的全部节点
    pub nodes: BTreeSet<NodeName>,
    pub steps: Vec<StepEvents>,
}

impl EventStream {
    pub fn event_count(&self) -> usize {
        self.steps.iter().map(|s| s.events.len()).sum()
    }

    /// 把事件流还原为每个节点对的连接区间 `[add, delete]`。
    ///
    /// 没有配对 delete 的 add 不会出现在结果中。
    pub fn intervals(&self) -> BTreeMap<Pair, Vec<(u64, u64)>> {
        let mut open: HashMap<&Pair, u64> = HashMap::new();
        let mut out: BTreeMap<Pair, Vec<(u64, u64)>> = BTreeMap::new();
        for st in &self.steps {
            for ev in &st.events {
                match ev {
                    Event::AddEdge(p) => {
                        open.insert(p, st.step);
                    }
                    Event::DeleteEdge(p) => {
                        if let Some(start) = open.remove(p) {
                            out.entry(p.clone()).or_default().push((start, st.step));
                        }
                    }
                }
            }
        }
        out
    }
}
