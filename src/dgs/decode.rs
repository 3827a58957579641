//! DGS 解码
//!
//! 只支持回放需要的子集：`st` / `an`（仅 setup step）/ `ae` / `de`。

use std::fs;
use std::path::Path;

use super::FORMAT_TAG;
use crate::error::{Error, Result};
use tracing::{debug, info, warn};

/// 事件 step 中的一条边操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeOp {
    Add {
        edge: String,
        a: String,
        b: String,
        line: usize,
    },
    Delete {
        edge: String,
        line: usize,
    },
}

impl EdgeOp {
    pub fn edge(&self) -> &str {
        match self {
            EdgeOp::Add { edge, .. } | EdgeOp::Delete { edge, .. } => edge,
        }
    }

    /// 源文件中的行号（从 1 开始）
    pub fn line(&self) -> usize {
        match self {
            EdgeOp::Add { line, .. } | EdgeOp::Delete { line, .. } => *line,
        }
    }
}

/// 一个事件 step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DgsStep {
    pub step: u64,
    pub line: usize,
    pub ops: Vec<EdgeOp>,
}

/// 解析后的不可变事件流文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DgsDocument {
    pub graph_name: String,
    pub declared_steps: u64,
    pub declared_events: u64,
    /// setup step（`st 0`）中声明的节点，保持文件顺序
    pub nodes: Vec<String>,
    /// setup 之后的事件 step，step 严格递增
    pub steps: Vec<DgsStep>,
}

impl DgsDocument {
    /// 包含 setup step 在内的 step 数
    pub fn step_count(&self) -> usize {
        self.steps.len() + 1
    }

    pub fn event_count(&self) -> usize {
        self.nodes.len() + self.steps.iter().map(|s| s.ops.len()).sum::<usize>()
    }
}

/// 从文件读取并解码
pub fn read_dgs(path: &Path) -> Result<DgsDocument> {
    let raw = fs::read_to_string(path)?;
    let doc = decode(&raw)?;
    info!(
        path = %path.display(),
        nodes = doc.nodes.len(),
        steps = doc.steps.len(),
        "📂 DGS 文件已打开"
    );
    Ok(doc)
}

/// 解码 DGS 文本。空行与 `#` 注释行被忽略。
pub fn decode(input: &str) -> Result<DgsDocument> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(idx, l)| (idx + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    let (line, tag) = lines
        .next()
        .ok_or_else(|| Error::format(0, "empty event stream"))?;
    if tag != FORMAT_TAG {
        return Err(Error::format(
            line,
            format!("format tag is '{tag}' but only '{FORMAT_TAG}' is supported"),
        ));
    }

    let (line, header) = lines
        .next()
        .ok_or_else(|| Error::format(line, "missing header line"))?;
    let (graph_name, declared_steps, declared_events) = parse_header(line, header)?;

    let (line, first) = lines
        .next()
        .ok_or_else(|| Error::format(line, "missing setup step 'st 0'"))?;
    if !first.starts_with("st") || parse_step(line, first)? != 0 {
        return Err(Error::format(
            line,
            format!("expected setup step 'st 0', got '{first}'"),
        ));
    }

    let mut nodes = Vec::new();
    let mut steps: Vec<DgsStep> = Vec::new();
    // None 表示仍处于 setup step
    let mut current: Option<DgsStep> = None;

    for (line, text) in lines {
        let mut tokens = text.split_whitespace();
        let Some(op) = tokens.next() else {
            continue;
        };
        if op == "st" {
            let step = parse_step(line, text)?;
            let prev = current.as_ref().map_or(0, |s| s.step);
            if step <= prev {
                return Err(Error::format(
                    line,
                    format!("step {step} does not follow step {prev}"),
                ));
            }
            if let Some(done) = current.replace(DgsStep {
                step,
                line,
                ops: Vec::new(),
            }) {
                steps.push(done);
            }
            continue;
        }

        let Some(st) = current.as_mut() else {
            match op {
                "an" => {
                    // 节点名之后的属性（如坐标）被忽略
                    let name = tokens
                        .next()
                        .ok_or_else(|| Error::format(line, "'an' without node name"))?;
                    nodes.push(name.to_string());
                }
                "ae" | "de" => {
                    return Err(Error::format(
                        line,
                        format!("unexpected line in setup step 0, expected 'an ..' got '{text}'"),
                    ));
                }
                other => {
                    return Err(Error::format(line, format!("unknown action '{other}'")));
                }
            }
            continue;
        };

        match op {
            "an" => {
                return Err(Error::format(
                    line,
                    format!("'an' is only allowed in the setup step, found in step {}", st.step),
                ));
            }
            "ae" => {
                let args: Vec<&str> = tokens.collect();
                if args.iter().any(|t| *t == ">" || *t == "<") {
                    return Err(Error::format(line, "directed edges are not supported"));
                }
                let [edge, a, b] = args.as_slice() else {
                    return Err(Error::format(
                        line,
                        format!("expected 'ae <edge> <node> <node>', got '{text}'"),
                    ));
                };
                if a == b {
                    return Err(Error::format(line, format!("self-loop edge on node {a}")));
                }
                st.ops.push(EdgeOp::Add {
                    edge: edge.to_string(),
                    a: a.to_string(),
                    b: b.to_string(),
                    line,
                });
            }
            "de" => {
                let args: Vec<&str> = tokens.collect();
                let [edge] = args.as_slice() else {
                    return Err(Error::format(
                        line,
                        format!("expected 'de <edge>', got '{text}'"),
                    ));
                };
                st.ops.push(EdgeOp::Delete {
                    edge: edge.to_string(),
                    line,
                });
            }
            other => {
                return Err(Error::format(line, format!("unknown action '{other}'")));
            }
        }
    }
    if let Some(done) = current {
        steps.push(done);
    }

    let doc = DgsDocument {
        graph_name,
        declared_steps,
        declared_events,
        nodes,
        steps,
    };
    check_declared_counts(&doc);
    debug!(nodes = doc.nodes.len(), steps = doc.steps.len(), "DGS 解码完成");
    Ok(doc)
}

fn parse_header(line: usize, header: &str) -> Result<(String, u64, u64)> {
    let tokens: Vec<&str> = header.split_whitespace().collect();
    let [name, steps, events] = tokens.as_slice() else {
        return Err(Error::format(
            line,
            format!("expected header '<graph-name> <steps> <events>', got '{header}'"),
        ));
    };
    let count = |raw: &str| {
        raw.parse::<u64>()
            .map_err(|_| Error::format(line, format!("invalid count '{raw}' in header")))
    };
    Ok((name.to_string(), count(*steps)?, count(*events)?))
}

fn parse_step(line: usize, text: &str) -> Result<u64> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.as_slice() {
        ["st", n] => n
            .parse::<u64>()
            .map_err(|_| Error::format(line, format!("invalid step number '{n}'"))),
        _ => Err(Error::format(
            line,
            format!("expected 'st <number>', got '{text}'"),
        )),
    }
}

/// 0 表示未知长度；非 0 且与实际不符时只告警
fn check_declared_counts(doc: &DgsDocument) {
    let steps = doc.step_count() as u64;
    let events = doc.event_count() as u64;
    if doc.declared_steps != 0 && doc.declared_steps != steps {
        warn!(declared = doc.declared_steps, actual = steps, "header 中的 step 数与实际不符");
    }
    if doc.declared_events != 0 && doc.declared_events != events {
        warn!(declared = doc.declared_events, actual = events, "header 中的事件数与实际不符");
    }
}
