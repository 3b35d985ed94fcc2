//! 任务数据模型

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};

// ============================================
// 任务状态
// ============================================

/// 任务状态
///
/// 正常推进路径为 Queued → Running → {Completed | Failed | Cancelled}，
/// 终态不再变化；唯一的外部跳转是强制完成。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// 排队中
    Queued,
    /// 运行中
    Running,
    /// 已完成
    Completed,
    /// 失败
    Failed,
    /// 已取消
    Cancelled,
}

impl TaskState {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// 强制完成后的状态；不允许强制完成时返回 `None`
    pub fn after_force_complete(&self) -> Option<TaskState> {
        match self {
            Self::Queued | Self::Running | Self::Failed => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// 获取中文显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Queued => "排队中",
            Self::Running => "运行中",
            Self::Completed => "已完成",
            Self::Failed => "失败",
            Self::Cancelled => "已取消",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(format!("未知的任务状态: {}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for TaskState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// 任务
// ============================================

/// 服务端长任务快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// 任务 ID
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// 任务名称
    #[serde(default)]
    pub name: String,

    /// 状态
    pub state: TaskState,

    /// 进度 (0-100)
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: u8,

    /// 状态说明 / 失败原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// 是否可取消
    #[serde(default)]
    pub cancellable: bool,

    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub queue_time: Option<DateTime<Utc>>,

    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated_time: Option<DateTime<Utc>>,

    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub finished_time: Option<DateTime<Utc>>,

    /// 所属集群
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    /// 所属主机
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// 终态对应的等待结果；非终态返回 `None`
    ///
    /// Completed → `Ok(task)`，Failed → `TaskFailed`，Cancelled → `TaskCancelled`。
    pub fn terminal_outcome(self) -> Option<Result<Task>> {
        match self.state {
            TaskState::Completed => Some(Ok(self)),
            TaskState::Failed => Some(Err(ClientError::TaskFailed {
                message: self
                    .message
                    .unwrap_or_else(|| "服务端未提供失败原因".to_string()),
                id: self.id,
            })),
            TaskState::Cancelled => Some(Err(ClientError::TaskCancelled {
                message: self.message.unwrap_or_else(|| "任务已被取消".to_string()),
                id: self.id,
            })),
            TaskState::Queued | TaskState::Running => None,
        }
    }

    pub fn progress_update(&self) -> TaskProgress {
        TaskProgress {
            id: self.id.clone(),
            name: self.name.clone(),
            state: self.state,
            progress: self.progress,
            message: self.message.clone(),
        }
    }
}

/// 进度通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub id: String,
    pub name: String,
    pub state: TaskState,
    pub progress: u8,
    pub message: Option<String>,
}

impl TaskProgress {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// 任务列表响应
///
/// 服务端既可能直接返回数组，也可能包一层 `{"tasks": [...]}`。
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TaskListing {
    Bare(Vec<Task>),
    Wrapped { tasks: Vec<Task> },
}

impl TaskListing {
    pub(crate) fn into_tasks(self) -> Vec<Task> {
        match self {
            Self::Bare(tasks) | Self::Wrapped { tasks } => tasks,
        }
    }
}

// ============================================
// 任务列表过滤
// ============================================

/// `GET /api/tasks` 的过滤条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub state: Option<TaskState>,
    pub host: Option<String>,
    pub limit: Option<u32>,
}

impl TaskFilter {
    pub fn with_state(mut self, state: TaskState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 查询串，无条件时为空字符串
    pub fn to_query(&self) -> String {
        let mut params = Vec::new();
        if let Some(state) = self.state {
            params.push(format!("state={}", state.as_str()));
        }
        if let Some(host) = &self.host {
            params.push(format!("host={}", urlencoding::encode(host)));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={}", limit));
        }

        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

// ============================================
// 宽松解析
// ============================================

fn deserialize_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("无效的任务 ID: {}", other))),
    }
}

fn deserialize_progress<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<u8, D::Error> {
    let value = match Value::deserialize(deserializer)? {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("无效的进度值: {}", s)))?,
        other => return Err(serde::de::Error::custom(format!("无效的进度值: {}", other))),
    };
    Ok(value.clamp(0.0, 100.0).round() as u8)
}

/// RFC 3339 字符串或 Unix 时间戳（秒）
fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| serde::de::Error::custom(format!("无效的时间 {}: {}", s, e))),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("无效的时间戳: {}", n))),
        other => Err(serde::de::Error::custom(format!("无效的时间: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn task(state: TaskState) -> Task {
        serde_json::from_value(json!({"id": "t1", "name": "migrate", "state": state.as_str()}))
            .unwrap()
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskState::Queued.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
    }

    #[test]
    fn test_force_complete_edges() {
        assert_eq!(TaskState::Queued.after_force_complete(), Some(TaskState::Completed));
        assert_eq!(TaskState::Running.after_force_complete(), Some(TaskState::Completed));
        assert_eq!(TaskState::Failed.after_force_complete(), Some(TaskState::Completed));
        assert_eq!(TaskState::Completed.after_force_complete(), None);
        assert_eq!(TaskState::Cancelled.after_force_complete(), None);
    }

    #[test]
    fn test_state_parsing_is_case_insensitive() {
        assert_eq!("RUNNING".parse::<TaskState>(), Ok(TaskState::Running));
        assert_eq!("Completed".parse::<TaskState>(), Ok(TaskState::Completed));
        assert_eq!("canceled".parse::<TaskState>(), Ok(TaskState::Cancelled));
        assert!("paused".parse::<TaskState>().is_err());
    }

    #[test]
    fn test_task_full_decode() {
        let task: Task = serde_json::from_value(json!({
            "id": 42,
            "name": "clone guest",
            "state": "Running",
            "progress": 37.6,
            "message": "copying disk",
            "cancellable": true,
            "queueTime": "2026-10-01T08:00:00Z",
            "startTime": 1790000000,
            "lastUpdatedTime": null,
            "cluster": "c1",
            "host": "node-3"
        }))
        .unwrap();

        assert_eq!(task.id, "42");
        assert_eq!(task.state, TaskState::Running);
        assert_eq!(task.progress, 38);
        assert!(task.cancellable);
        assert!(task.queue_time.is_some());
        assert_eq!(task.start_time.unwrap().timestamp(), 1_790_000_000);
        assert_eq!(task.last_updated_time, None);
        assert_eq!(task.host.as_deref(), Some("node-3"));
    }

    #[test]
    fn test_progress_is_clamped() {
        let running = |progress: Value| -> Task {
            serde_json::from_value(json!({"id": "a", "state": "running", "progress": progress}))
                .unwrap()
        };

        let task = running(json!(250));
        assert_eq!(task.progress, 100);

        let task = running(json!("45%"));
        assert_eq!(task.progress, 45);

        let task: Task = serde_json::from_value(json!({"id": "a", "state": "queued"})).unwrap();
        assert_eq!(task.progress, 0);
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        let result = serde_json::from_value::<Task>(json!({"id": "a", "state": "paused"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_terminal_outcome() {
        assert!(task(TaskState::Running).terminal_outcome().is_none());
        assert!(task(TaskState::Completed).terminal_outcome().unwrap().is_ok());

        let mut failed = task(TaskState::Failed);
        failed.message = Some("disk full".into());
        let err = failed.terminal_outcome().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TaskFailed);
        assert!(err.to_string().contains("disk full"));

        let err = task(TaskState::Cancelled).terminal_outcome().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TaskCancelled);
    }

    #[test]
    fn test_listing_shapes() {
        let bare: TaskListing =
            serde_json::from_value(json!([{"id": "a", "state": "queued"}])).unwrap();
        assert_eq!(bare.into_tasks().len(), 1);

        let wrapped: TaskListing = serde_json::from_value(json!({
            "tasks": [{"id": "a", "state": "queued"}, {"id": "b", "state": "failed"}]
        }))
        .unwrap();
        assert_eq!(wrapped.into_tasks().len(), 2);
    }

    #[test]
    fn test_filter_query() {
        assert_eq!(TaskFilter::default().to_query(), "");
        let filter = TaskFilter::default()
            .with_state(TaskState::Running)
            .with_host("node 3")
            .with_limit(20);
        assert_eq!(filter.to_query(), "?state=running&host=node%203&limit=20");
    }
}
