//! CLI 命令处理模块

pub mod common; // 公共工具函数
pub mod host;
pub mod login;
pub mod output;
pub mod task;
pub mod user;

use crate::config::CliConfig;
use output::OutputFormat;

/// 命令执行上下文
pub struct Context {
    pub config: CliConfig,
    pub format: OutputFormat,
}
