//! 回放节奏控制
//!
//! 回放中唯一的挂起点：step 之间的等待，以及交互模式下的人工确认。

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use crate::error::Result;
use tracing::info;

pub trait Pacer {
    /// 在两个 step 之间等待
    fn pause(&mut self, delay: Duration);
    /// 等待操作员确认后继续
    fn confirm(&mut self, prompt: &str) -> Result<()>;
}

/// 真实时间等待；确认从标准输入读一行。
#[derive(Debug, Default)]
pub struct RealtimePacer;

impl Pacer for RealtimePacer {
    fn pause(&mut self, delay: Duration) {
        if !delay.is_zero() {
            info!(delay_ms = delay.as_millis() as u64, "⏳ 等待下一个 step");
            thread::sleep(delay);
        }
    }

    fn confirm(&mut self, prompt: &str) -> Result<()> {
        let mut stderr = io::stderr();
        write!(stderr, "{prompt} ")?;
        stderr.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(())
    }
}

/// 不等待，只记录（dry run 与测试使用）
#[derive(Debug, Default)]
pub struct InstantPacer {
    pub pauses: Vec<Duration>,
    pub prompts: Vec<String>,
}

impl InstantPacer {
    pub fn total_pause(&self) -> Duration {
        self.pauses.iter().sum()
    }
}

impl Pacer for InstantPacer {
    fn pause(&mut self, delay: Duration) {
        self.pauses.push(delay);
    }

    fn confirm(&mut self, prompt: &str) -> Result<()> {
        self.prompts.push(prompt.to_string());
        Ok(())
    }
}
