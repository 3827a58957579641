//! 事件合并
//!
//! 把逐对的接触区间转换成最少的、互不重叠的加边/删边事件序列。
//!
//! 发现过程是非同步的周期性扫描，连续两次看到同一对节点被视为一次持续接触：
//! - 若某对节点已有未关闭的 add，新的 add 被抑制；
//! - 若新的 delete 之前最近的事件是该对的 delete，旧 delete 被移除，区间延长到新的 end。

use std::collections::{BTreeMap, BTreeSet};

use super::event::{Event, EventStream, StepEvents};
use super::record::{ContactRecord, NodeName, Pair};
use crate::error::{Error, Result};
use tracing::{debug, info, trace};

/// 零时长接触的默认补齐量
pub const DEFAULT_ZERO_DURATION_PAD: u64 = 10;

/// 合并参数
#[derive(Debug, Clone)]
pub struct CoalesceOpts {
    /// `start == end` 时给 end 加上的偏移量（必须为正）
    pub zero_duration_pad: u64,
}

impl Default for CoalesceOpts {
    fn default() -> Self {
        Self {
            zero_duration_pad: DEFAULT_ZERO_DURATION_PAD,
        }
    }
}

/// 增量式事件合并器。记录必须按 start 非降序推入。
#[derive(Debug)]
pub struct EventCoalescer {
    opts: CoalesceOpts,
    steps: BTreeMap<u64, Vec<Event>>,
    nodes: BTreeSet<NodeName>,
    last_start: Option<u64>,
}

impl EventCoalescer {
    pub fn new(opts: CoalesceOpts) -> Result<Self> {
        if opts.zero_duration_pad == 0 {
            return Err(Error::config("zero_duration_pad must be positive"));
        }
        Ok(Self {
            opts,
            steps: BTreeMap::new(),
            nodes: BTreeSet::new(),
            last_start: None,
        })
    }

    /// 推入一条接触记录
    #[tracing::instrument(level = "trace", skip(self, rec), fields(start = rec.start, end = rec.end))]
    pub fn push(&mut self, rec: &ContactRecord) -> Result<()> {
        let start = rec.start;
        let mut end = rec.end;
        if end < start {
            return Err(Error::invariant(format!(
                "contact {} ends at {end} before it starts at {start}",
                rec.pair()
            )));
        }
        if let Some(last) = self.last_start
            && start < last
        {
            return Err(Error::invariant(format!(
                "contact {} starts at {start}, before previously pushed start {last}",
                rec.pair()
            )));
        }
        self.last_start = Some(start);

        if start == end {
            end = end.saturating_add(self.opts.zero_duration_pad);
        }

        self.nodes.insert(rec.observer.clone());
        self.nodes.insert(rec.observed.clone());

        let pair = rec.pair();
        if self.add_allowed(&pair, start) {
            trace!(pair = %pair, step = start, "插入 add");
            self.steps
                .entry(start)
                .or_default()
                .push(Event::AddEdge(pair.clone()));
        } else if let Some(open_end) = self.open_interval_end(&pair, start)
            && open_end >= end
        {
            trace!(pair = %pair, open_end, "接触被已有区间完全覆盖");
            return Ok(());
        }

        self.fold_previous_delete(&pair, end)?;
        self.steps
            .entry(end)
            .or_default()
            .push(Event::DeleteEdge(pair));
        Ok(())
    }

    /// 结束合并，输出按 step 升序的事件流
    pub fn finish(self) -> EventStream {
        let steps = self
            .steps
            .into_iter()
            .filter(|(_, events)| !events.is_empty())
            .map(|(step, events)| StepEvents { step, events })
            .collect();
        EventStream {
            nodes: self.nodes,
            steps,
        }
    }

    /// 向前查找：先遇到 delete（或什么都没有）则可以插入 add；先遇到 add 则抑制。
    fn add_allowed(&self, pair: &Pair, start: u64) -> bool {
        let same_step_add = self
            .steps
            .get(&start)
            .is_some_and(|evs| evs.iter().any(|ev| ev.is_add() && ev.pair() == pair));
        if same_step_add {
            return false;
        }
        for (_, events) in self.steps.range(..start).rev() {
            for ev in events.iter().rev() {
                if ev.pair() != pair {
                    continue;
                }
                return !ev.is_add();
            }
        }
        true
    }

    /// 当前打开区间（start 时刻仍连接）的结束 step
    fn open_interval_end(&self, pair: &Pair, start: u64) -> Option<u64> {
        self.steps.range(start..).find_map(|(step, events)| {
            events
                .iter()
                .any(|ev| !ev.is_add() && ev.pair() == pair)
                .then_some(*step)
        })
    }

    /// 向前查找：先遇到 add 则直接返回；先遇到 delete 则删除它（被新的 delete 取代）。
    fn fold_previous_delete(&mut self, pair: &Pair, end: u64) -> Result<()> {
        let mut superseded = None;
        'scan: for (step, events) in self.steps.range(..end).rev() {
            for (idx, ev) in events.iter().enumerate().rev() {
                if ev.pair() != pair {
                    continue;
                }
                if ev.is_add() {
                    return Ok(());
                }
                superseded = Some((*step, idx));
                break 'scan;
            }
        }

        let Some((step, idx)) = superseded else {
            return Err(Error::invariant(format!(
                "delete-edge {pair} at step {end} has no preceding add-edge"
            )));
        };
        debug!(pair = %pair, from = step, to = end, "合并相邻接触，移动 delete");
        if let Some(events) = self.steps.get_mut(&step) {
            events.remove(idx);
            if events.is_empty() {
                self.steps.remove(&step);
            }
        }
        Ok(())
    }
}

/// 合并一批无序接触记录。
///
/// 记录先按 `(start, end, pair)` 排序，结果与输入顺序无关。
pub fn coalesce(records: &[ContactRecord], opts: &CoalesceOpts) -> Result<EventStream> {
    let mut sorted: Vec<&ContactRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        (a.start, a.end, a.pair()).cmp(&(b.start, b.end, b.pair()))
    });

    let mut coalescer = EventCoalescer::new(opts.clone())?;
    for rec in sorted {
        coalescer.push(rec)?;
    }
    let stream = coalescer.finish();
    info!(
        records = records.len(),
        nodes = stream.nodes.len(),
        steps = stream.steps.len(),
        events = stream.event_count(),
        "🔗 接触合并完成"
    );
    Ok(stream)
}
