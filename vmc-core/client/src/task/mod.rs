//! 长任务生命周期
//!
//! - 任务查询：按 ID、按名称、列表过滤 ([`TaskApi`])
//! - 等待完成：带截止时间、取消信号和重试的轮询 ([`wait_for_task`])
//! - 强制完成：管理员手动跳过任务收敛 ([`TaskApi::force_complete`])

pub mod api;
pub mod model;
pub mod poller;

pub use api::TaskApi;
pub use model::{Task, TaskFilter, TaskProgress, TaskState};
pub use poller::{wait_for_task, wait_for_task_id, ProgressSink, WaitOptions};
