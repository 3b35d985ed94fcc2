//! 错误分类
//!
//! 把 HTTP 响应（状态码 + 响应体）或连接层失败映射成 [`ClientError`]。
//! 传输层和任务轮询共用这里的分类规则：
//!
//! | 状态码          | 分类        | 可重试 |
//! |-----------------|-------------|--------|
//! | 2xx             | 成功        | -      |
//! | 401 / 403       | Auth        | 否     |
//! | 404             | NotFound    | 否     |
//! | 400 / 422       | Validation  | 否     |
//! | 408 / 429       | Server      | 是     |
//! | 其他 4xx        | Validation  | 否     |
//! | 5xx             | Server      | 是     |
//! | 1xx / 3xx       | Decode      | 否     |
//! | 连接失败        | Transport   | 是     |

use serde_json::Value;

use crate::error::ClientError;

/// 从错误响应体中解析出的结构
///
/// 服务端约定为 `{"code": ..., "message": ...}`，代理层也可能原样透传上游响应，
/// 解析失败时退回原始文本。
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        let obj = value.as_object()?;

        let code = ["code", "errorCode", "error_code"]
            .iter()
            .find_map(|key| obj.get(*key))
            .and_then(scalar_to_string);
        let message = ["message", "msg", "error", "detail"]
            .iter()
            .find_map(|key| obj.get(*key))
            .and_then(scalar_to_string);

        if code.is_none() && message.is_none() {
            return None;
        }
        Some(Self { code, message })
    }

    /// 供人阅读的单行描述
    pub fn summary(&self) -> Option<String> {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => Some(format!("{} (code {})", message, code)),
            (None, Some(message)) => Some(message.clone()),
            (Some(code), None) => Some(format!("code {}", code)),
            (None, None) => None,
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 分类非 2xx 响应
///
/// 调用方保证 `status` 不在 2xx 范围内；如果传入 2xx 会被当作意外状态归入 Decode。
pub fn classify_response(status: u16, body: &[u8]) -> ClientError {
    let body = String::from_utf8_lossy(body).into_owned();
    let server_message = || {
        let text = body.trim();
        ErrorBody::parse(text)
            .and_then(|parsed| parsed.summary())
            .unwrap_or_else(|| {
                if text.is_empty() {
                    "<空响应>".to_string()
                } else {
                    text.to_string()
                }
            })
    };

    match status {
        401 | 403 => ClientError::Auth { status, body },
        404 => ClientError::NotFound {
            status: Some(status),
            message: server_message(),
            body: Some(body),
        },
        408 | 429 => ClientError::Server { status, body },
        400..=499 => ClientError::Validation {
            status,
            message: server_message(),
            body,
        },
        500..=599 => ClientError::Server { status, body },
        _ => ClientError::Decode {
            message: format!("意外的 HTTP 状态码 {}", status),
            status: Some(status),
            body: Some(body),
        },
    }
}

/// 分类连接层失败（DNS、TLS 握手、连接拒绝、请求超时、读取响应体失败）
pub fn classify_connection(err: &reqwest::Error) -> ClientError {
    let reason = if err.is_timeout() {
        "请求超时"
    } else if err.is_connect() {
        "连接失败"
    } else if err.is_body() || err.is_decode() {
        "读取响应失败"
    } else {
        "请求失败"
    };

    let target = err
        .url()
        .map(|url| format!(" {}", url))
        .unwrap_or_default();

    ClientError::transport(format!("{}{}: {}", reason, target, err))
}
