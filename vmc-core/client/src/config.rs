//! 客户端配置

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 开发环境保留端口：只有这个端口走明文 HTTP，其余端口一律 HTTPS
pub const DEV_PLAINTEXT_PORT: u16 = 8080;

/// 管理 API 默认端口
pub const DEFAULT_API_PORT: u16 = 443;

/// 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// 管理节点地址（主机名或 IP）
    pub host: String,

    /// 管理 API 端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 跳过 TLS 证书校验
    #[serde(default)]
    pub insecure_tls: bool,

    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// 连接超时（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// 走明文 HTTP 的端口
    #[serde(default = "default_plaintext_port")]
    pub plaintext_port: u16,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            insecure_tls: false,
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            plaintext_port: default_plaintext_port(),
        }
    }

    pub fn with_insecure_tls(mut self, insecure: bool) -> Self {
        self.insecure_tls = insecure;
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout = secs;
        self
    }

    pub fn with_plaintext_port(mut self, port: u16) -> Self {
        self.plaintext_port = port;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// 按端口约定选择协议
    pub fn scheme(&self) -> &'static str {
        if self.port == self.plaintext_port {
            "http"
        } else {
            "https"
        }
    }

    /// `scheme://host:port/api`
    pub fn base_url(&self) -> String {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        let authority = if host.contains(':') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        };
        format!("{}://{}/api", self.scheme(), authority)
    }
}

/// 重试策略（指数退避）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// 单次拉取的最大尝试次数（含首次）
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 首次重试延迟（毫秒）
    #[serde(default = "default_initial_delay")]
    pub initial_delay: u64,

    /// 最大重试延迟（毫秒）
    #[serde(default = "default_max_delay")]
    pub max_delay: u64,

    /// 退避倍数
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// 不重试
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// 第 `retry` 次重试前的等待时间（从 0 开始计数）
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(retry.min(16) as i32);
        let delay = (self.initial_delay as f64 * factor).min(self.max_delay as f64);
        Duration::from_millis(delay as u64)
    }
}

/// 任务等待配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskWaitConfig {
    /// 轮询间隔（毫秒）
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// 拉取任务失败时的重试策略
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for TaskWaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            retry: RetryPolicy::default(),
        }
    }
}

impl TaskWaitConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }
}

// 默认值函数
fn default_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_plaintext_port() -> u16 {
    DEV_PLAINTEXT_PORT
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_poll_interval() -> u64 {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_by_port() {
        let config = ClientConfig::new("10.0.0.5", DEV_PLAINTEXT_PORT);
        assert_eq!(config.base_url(), "http://10.0.0.5:8080/api");

        let config = ClientConfig::new("mgmt.lab", 443);
        assert_eq!(config.base_url(), "https://mgmt.lab:443/api");

        let config = ClientConfig::new("mgmt.lab", 8443);
        assert_eq!(config.scheme(), "https");
    }

    #[test]
    fn test_ipv6_authority() {
        let config = ClientConfig::new("fd00::10", 8443);
        assert_eq!(config.base_url(), "https://[fd00::10]:8443/api");

        let config = ClientConfig::new("[::1]", 8080);
        assert_eq!(config.base_url(), "http://[::1]:8080/api");
    }

    #[test]
    fn test_plaintext_port_override() {
        let config = ClientConfig::new("127.0.0.1", 39001).with_plaintext_port(39001);
        assert_eq!(config.scheme(), "http");
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"host": "mgmt.lab"}"#).unwrap();
        assert_eq!(config.port, DEFAULT_API_PORT);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.plaintext_port, DEV_PLAINTEXT_PORT);
        assert!(!config.insecure_tls);
    }

    #[test]
    fn test_retry_delay_calculation() {
        let policy = RetryPolicy {
            initial_delay: 100,
            max_delay: 1_000,
            backoff_multiplier: 2.0,
            ..Default::default()
        };

        // 100 * 2^0
        assert_eq!(policy.calculate_delay(0), Duration::from_millis(100));
        // 100 * 2^1
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(800));
        // 封顶
        assert_eq!(policy.calculate_delay(4), Duration::from_millis(1_000));
        assert_eq!(policy.calculate_delay(30), Duration::from_millis(1_000));
    }

    #[test]
    fn test_retry_policy_none() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
    }
}
