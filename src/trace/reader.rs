//! 接触 trace 读取
//!
//! 输入格式（每行以制表符分隔）：
//! `observer  observed  start  end  occurrence  gap`，只使用前四列。

use std::fs;
use std::path::Path;

use super::record::{ContactRecord, NodeName};
use crate::error::{Error, Result};
use tracing::{debug, info};

/// 从文件读取全部接触记录
pub fn read_contacts(path: &Path) -> Result<Vec<ContactRecord>> {
    let raw = fs::read_to_string(path)?;
    let records = parse_contacts(&raw)?;
    info!(path = %path.display(), records = records.len(), "📖 读取接触 trace");
    Ok(records)
}

/// 解析 trace 文本。空行和 `#` 开头的行被忽略。
pub fn parse_contacts(input: &str) -> Result<Vec<ContactRecord>> {
    let mut records = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        records.push(parse_line(line_no, trimmed)?);
    }
    debug!(records = records.len(), "trace 解析完成");
    Ok(records)
}

fn parse_line(line_no: usize, line: &str) -> Result<ContactRecord> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(Error::format(
            line_no,
            format!("expected at least 4 tab-separated fields, got {}", fields.len()),
        ));
    }

    let node = |raw: &str| -> Result<NodeName> {
        if raw.is_empty() {
            return Err(Error::format(line_no, "empty node identifier"));
        }
        Ok(NodeName::parse(raw))
    };
    let time = |raw: &str, what: &str| -> Result<u64> {
        raw.parse::<u64>()
            .map_err(|_| Error::format(line_no, format!("invalid {what} time '{raw}'")))
    };

    let observer = node(fields[0])?;
    let observed = node(fields[1])?;
    let start = time(fields[2], "start")?;
    let end = time(fields[3], "end")?;

    if observer == observed {
        return Err(Error::format(
            line_no,
            format!("node {observer} cannot be in contact with itself"),
        ));
    }
    if end < start {
        return Err(Error::format(
            line_no,
            format!("contact ends at {end} before it starts at {start}"),
        ));
    }

    Ok(ContactRecord {
        observer,
        observed,
        start,
        end,
    })
}
