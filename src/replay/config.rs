//! 回放运行参数
//!
//! 可以从 JSON 文件加载，所有字段都有默认值；命令行参数覆盖文件中的值。

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::allocator::AddressingConfig;
use super::controller::Position;
use super::patcher::PatchOpts;
use crate::error::{Error, Result};

/// step 之间的等待方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// 每个 step 固定等待 `step_delay_ms`
    #[default]
    Fixed,
    /// 等待 `step_delay_ms` 乘以与上一个 step 的间隔
    Proportional,
}

/// 放在网格之外的控制节点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlNodeSpec {
    pub name: String,
    pub model: String,
    pub position: Position,
}

impl Default for ControlNodeSpec {
    fn default() -> Self {
        Self {
            name: "control".to_string(),
            model: "MONITORING".to_string(),
            position: Position { x: 50, y: 50 },
        }
    }
}

/// 节点按行排列的网格布局（仅用于可视化）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub columns: u32,
    pub spacing: i32,
    pub origin: Position,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            columns: 10,
            spacing: 50,
            origin: Position { x: 100, y: 100 },
        }
    }
}

impl GridLayout {
    pub fn position(&self, slot: u32) -> Position {
        let col = (slot % self.columns) as i32;
        let row = (slot / self.columns) as i32;
        Position {
            x: self.origin.x + col * self.spacing,
            y: self.origin.y + row * self.spacing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// 只处理前 N 个事件 step；None 表示全部
    pub max_steps: Option<usize>,
    pub step_delay_ms: u64,
    pub pacing: PacingMode,
    /// 每个 step 之前等待操作员确认
    pub interactive: bool,
    pub node_model: String,
    /// 承载守护进程配置的服务名
    pub service: String,
    pub config_file: String,
    pub addressing: AddressingConfig,
    pub patch: PatchOpts,
    pub control_node: Option<ControlNodeSpec>,
    /// 控制网络网段，作为会话选项 `controlnet` 下发
    pub control_net: Option<String>,
    pub grid: GridLayout,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            step_delay_ms: 5000,
            pacing: PacingMode::Fixed,
            interactive: false,
            node_model: "DTN".to_string(),
            service: "dtnd".to_string(),
            config_file: "dtnd.toml".to_string(),
            addressing: AddressingConfig::default(),
            patch: PatchOpts::default(),
            control_node: None,
            control_net: None,
            grid: GridLayout::default(),
        }
    }
}

impl ReplayConfig {
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: ReplayConfig = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.columns == 0 {
            return Err(Error::config("grid.columns must be positive"));
        }
        if self.service.is_empty() || self.config_file.is_empty() {
            return Err(Error::config("service and config_file must be set"));
        }
        Ok(())
    }

    /// 进入某个 step 之前的等待时间；`gap` 是与上一个 step 的间隔
    pub fn step_delay(&self, gap: u64) -> Duration {
        let base = Duration::from_millis(self.step_delay_ms);
        match self.pacing {
            PacingMode::Fixed => base,
            PacingMode::Proportional => base.saturating_mul(u32::try_from(gap).unwrap_or(u32::MAX)),
        }
    }
}
