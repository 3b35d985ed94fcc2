//! 客户端错误定义
//!
//! 所有对外返回的错误都是结构化的 [`ClientError`]，调用方按 [`ErrorKind`] 分支，
//! 不需要解析错误文本。原始响应体只为诊断保留。

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 连接/TLS/DNS/超时等连接层失败
    Transport,
    /// 401/403
    Auth,
    /// 400/422
    Validation,
    /// 404 或名称查找失败
    NotFound,
    /// 5xx
    Server,
    /// 任务进入 Failed
    TaskFailed,
    /// 任务进入 Cancelled，或等待被取消
    TaskCancelled,
    /// 等待任务超过截止时间
    Timeout,
    /// 响应体与预期结构不符
    Decode,
}

impl ErrorKind {
    /// 重复同一请求是否可能成功
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport | Self::Server)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Auth => "auth",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Server => "server",
            Self::TaskFailed => "task_failed",
            Self::TaskCancelled => "task_cancelled",
            Self::Timeout => "timeout",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 客户端错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("传输错误: {message}")]
    Transport { message: String },

    #[error("认证失败 [{status}]: {body}")]
    Auth { status: u16, body: String },

    #[error("请求校验失败 [{status}]: {message} (响应: {body})")]
    Validation {
        status: u16,
        message: String,
        body: String,
    },

    #[error("资源不存在{}: {message}", render_response(*.status, .body.as_deref()))]
    NotFound {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    #[error("服务端错误 [{status}]: {body}")]
    Server { status: u16, body: String },

    #[error("任务 {id} 执行失败: {message}")]
    TaskFailed { id: String, message: String },

    #[error("任务 {id} 已取消: {message}")]
    TaskCancelled { id: String, message: String },

    #[error("等待任务 {id} 超时 (已等待 {waited:?})")]
    Timeout { id: String, waited: Duration },

    #[error("响应解析失败{}: {message}", render_response(*.status, .body.as_deref()))]
    Decode {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },
}

fn render_response(status: Option<u16>, body: Option<&str>) -> String {
    match (status, body) {
        (Some(status), Some(body)) => format!(" [{}] (响应: {})", status, body),
        (Some(status), None) => format!(" [{}]", status),
        (None, Some(body)) => format!(" (响应: {})", body),
        (None, None) => String::new(),
    }
}

impl ClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// 与 HTTP 无关的解析失败（例如本地构造的数据不符合预期）
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// 名称查找失败，没有对应的 HTTP 响应
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Server { .. } => ErrorKind::Server,
            Self::TaskFailed { .. } => ErrorKind::TaskFailed,
            Self::TaskCancelled { .. } => ErrorKind::TaskCancelled,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// HTTP 状态码（连接层错误和任务错误没有状态码）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. }
            | Self::Validation { status, .. }
            | Self::Server { status, .. } => Some(*status),
            Self::NotFound { status, .. } | Self::Decode { status, .. } => *status,
            _ => None,
        }
    }

    /// 原始响应体，仅用于诊断
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::Auth { body, .. }
            | Self::Validation { body, .. }
            | Self::Server { body, .. } => Some(body),
            Self::NotFound { body, .. } | Self::Decode { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

/// 客户端结果类型
pub type Result<T> = std::result::Result<T, ClientError>;
