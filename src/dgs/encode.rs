//! DGS 编码
//!
//! 为每个 AddEdge 分配唯一边名 `e<n>`，匹配的 DeleteEdge 复用同一个名字。
//! step 0 保留给 setup；事件流中出现 step 0 时，所有事件 step 整体后移 1。

use std::collections::HashMap;
use std::io::Write;

use super::FORMAT_TAG;
use crate::error::{Error, Result};
use crate::id::IdCounter;
use crate::trace::{Event, EventStream, NodeName, Pair};
use tracing::{debug, info, warn};

/// 编码统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeStats {
    /// 包含 `st 0` 在内的 step 数
    pub steps: usize,
    /// `an` + `ae` + `de` 行数
    pub events: usize,
    /// 分配的边名数量
    pub edges: usize,
}

/// 把事件流写成 DGS 文本
#[tracing::instrument(skip(stream, out), fields(steps = stream.steps.len()))]
pub fn encode<W: Write>(stream: &EventStream, graph_name: &str, out: &mut W) -> Result<EncodeStats> {
    if graph_name.is_empty() || graph_name.contains(char::is_whitespace) {
        return Err(Error::config(format!(
            "graph name '{graph_name}' must be a single non-empty token"
        )));
    }
    check_node_labels(stream)?;

    let offset = u64::from(stream.steps.first().is_some_and(|s| s.step == 0));
    if offset > 0 {
        warn!("事件流包含 step 0，全部事件 step 后移 1 以让出 setup step");
    }

    let stats = EncodeStats {
        steps: stream.steps.len() + 1,
        events: stream.nodes.len() + stream.event_count(),
        edges: 0,
    };

    writeln!(out, "{FORMAT_TAG}")?;
    writeln!(out, "{graph_name} {} {}", stats.steps, stats.events)?;
    writeln!(out, "st 0")?;
    for node in &stream.nodes {
        writeln!(out, "an {node}")?;
    }

    let mut names = IdCounter::default();
    let mut open: HashMap<&Pair, String> = HashMap::new();
    for st in &stream.steps {
        let step = st.step.checked_add(offset).ok_or_else(|| {
            Error::invariant(format!("step {} cannot be shifted past u64::MAX", st.step))
        })?;
        writeln!(out, "st {step}")?;
        for ev in &st.events {
            match ev {
                Event::AddEdge(pair) => {
                    if open.contains_key(pair) {
                        return Err(Error::invariant(format!(
                            "add-edge {pair} at step {step} while an earlier add is still open"
                        )));
                    }
                    let edge = format!("e{}", names.next());
                    writeln!(out, "ae {edge} {} {}", pair.low(), pair.high())?;
                    open.insert(pair, edge);
                }
                Event::DeleteEdge(pair) => {
                    let edge = open.remove(pair).ok_or_else(|| {
                        Error::invariant(format!(
                            "delete-edge {pair} at step {step} has no open add-edge"
                        ))
                    })?;
                    writeln!(out, "de {edge}")?;
                }
            }
        }
    }

    if !open.is_empty() {
        debug!(open = open.len(), "事件流结束时仍有未关闭的边");
    }

    let stats = EncodeStats {
        edges: names.peek() as usize,
        ..stats
    };
    info!(
        steps = stats.steps,
        events = stats.events,
        edges = stats.edges,
        "📝 DGS 编码完成"
    );
    Ok(stats)
}

/// 不同节点渲染出相同标签（如 `5` 与 `n5`）时无法写出无歧义的事件流
fn check_node_labels(stream: &EventStream) -> Result<()> {
    let mut seen: HashMap<String, &NodeName> = HashMap::new();
    for node in &stream.nodes {
        if let Some(prev) = seen.insert(node.to_string(), node) {
            return Err(Error::invariant(format!(
                "nodes {prev:?} and {node:?} both render as '{node}'"
            )));
        }
    }
    Ok(())
}

/// 编码到字符串
pub fn encode_to_string(stream: &EventStream, graph_name: &str) -> Result<String> {
    let mut buf = Vec::new();
    encode(stream, graph_name, &mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::invariant(format!("encoded stream is not UTF-8: {e}")))
}
