//! 会话管理
//!
//! [`Session`] 持有目标地址、TLS 设置、Bearer 令牌以及惰性创建的传输句柄。
//! 它作为显式参数传入每个操作，没有任何进程级的全局认证状态。
//!
//! 修改令牌的方法（`login` / `logout` / `set_token`）都需要 `&mut self`：
//! 同一个会话同一时刻只能由一个调用方驱动。不同会话之间没有共享状态。

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use bytes::Bytes;
use once_cell::sync::OnceCell;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::{HostApi, UserApi};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::task::TaskApi;
use crate::transport::{ApiRequest, HttpTransport, Transport};

/// 解析失败时错误里保留的响应体最大长度
const DECODE_BODY_LIMIT: usize = 2048;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    realm: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// 管理 API 会话
pub struct Session {
    config: ClientConfig,

    /// 认证令牌，登录成功前为空
    token: Option<String>,

    /// 首次使用时创建，会话生命周期内复用
    transport: OnceCell<Arc<dyn Transport>>,
}

impl Session {
    /// 创建会话，HTTP 连接池在第一次请求时才建立
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            token: None,
            transport: OnceCell::new(),
        }
    }

    /// 使用自定义传输实现创建会话
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            token: None,
            transport: OnceCell::with_value(transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// 直接设置令牌（例如复用外部获得的令牌）
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// 注销登出，只清除本地令牌
    pub fn logout(&mut self) {
        info!("注销会话: {}", self.config.host);
        self.token = None;
    }

    /// 目标是否为本机回环地址
    pub fn is_loopback(&self) -> bool {
        is_loopback_host(&self.config.host)
    }

    /// 认证登录
    ///
    /// 目标为回环地址时视为本机可信访问，直接返回成功，不发起任何网络请求。
    ///
    /// # Arguments
    /// * `username` - 用户名
    /// * `password` - 密码
    /// * `realm` - 认证域
    pub async fn login(&mut self, username: &str, password: &str, realm: &str) -> Result<()> {
        if self.is_loopback() {
            info!("目标 {} 为本机地址，跳过登录", self.config.host);
            return Ok(());
        }

        info!("登录: {}@{} ({})", username, realm, self.config.host);

        let req = LoginRequest {
            username,
            password,
            realm,
        };
        let resp: LoginResponse = self.request_json(Method::POST, "auth", Some(&req)).await?;

        if resp.token.is_empty() {
            return Err(ClientError::decode("登录响应中的 token 为空"));
        }

        self.token = Some(resp.token);
        info!("登录成功");
        Ok(())
    }

    fn transport(&self) -> Result<&Arc<dyn Transport>> {
        self.transport.get_or_try_init(|| {
            debug!("创建 HTTP 传输: {}", self.config.base_url());
            let transport = HttpTransport::new(&self.config)?;
            Ok(Arc::new(transport) as Arc<dyn Transport>)
        })
    }

    /// 发送请求并返回原始响应体
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Bytes> {
        let mut request = ApiRequest::new(method, path).with_token(self.token.clone());
        if let Some(body) = body {
            let encoded = serde_json::to_vec(body)
                .map_err(|e| ClientError::decode(format!("序列化请求体失败: {}", e)))?;
            request = request.with_body(encoded);
        }

        self.transport()?.execute(request).await
    }

    /// 发送请求并把响应体解析为 `R`
    pub async fn request_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<R> {
        let bytes = self.request(method, path, body).await?;
        decode_json(&bytes)
    }

    /// 获取任务 API
    pub fn task(&self) -> TaskApi<'_> {
        TaskApi::new(self)
    }

    /// 获取主机管理 API
    pub fn host(&self) -> HostApi<'_> {
        HostApi::new(self)
    }

    /// 获取用户管理 API
    pub fn user(&self) -> UserApi<'_> {
        UserApi::new(self)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("transport_ready", &self.transport.get().is_some())
            .finish()
    }
}

/// 判断主机是否为回环地址（`localhost`、`127.0.0.0/8`、`::1`，可带方括号）
pub fn is_loopback_host(host: &str) -> bool {
    let host = host.trim().trim_start_matches('[').trim_end_matches(']');
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

pub(crate) fn decode_json<R: DeserializeOwned>(bytes: &[u8]) -> Result<R> {
    serde_json::from_slice(bytes).map_err(|e| {
        let text = String::from_utf8_lossy(bytes);
        let body = if text.len() > DECODE_BODY_LIMIT {
            let mut cut = DECODE_BODY_LIMIT;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &text[..cut])
        } else {
            text.into_owned()
        };
        ClientError::Decode {
            message: e.to_string(),
            status: None,
            body: Some(body),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_hosts() {
        for host in ["localhost", "LOCALHOST", "127.0.0.1", "127.1.2.3", "::1", "[::1]"] {
            assert!(is_loopback_host(host), "{}", host);
        }
        for host in ["10.0.0.1", "mgmt.lab", "localhost.lab", "::2", ""] {
            assert!(!is_loopback_host(host), "{}", host);
        }
    }

    #[test]
    fn test_session_starts_unauthenticated() {
        let session = Session::new(ClientConfig::new("mgmt.lab", 443));
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_debug_hides_token() {
        let mut session = Session::new(ClientConfig::new("mgmt.lab", 443));
        session.set_token("secret-token");
        let text = format!("{:?}", session);
        assert!(!text.contains("secret-token"));
        assert!(text.contains("***"));
    }

    #[test]
    fn test_transport_created_once() {
        let session = Session::new(ClientConfig::new("mgmt.lab", 443));
        assert!(session.transport.get().is_none());

        let first = session.transport().unwrap().clone();
        let second = session.transport().unwrap().clone();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(session.transport.get().is_some());
    }

    #[test]
    fn test_decode_json_error_keeps_body() {
        let err = decode_json::<LoginResponse>(br#"{"tok": "x"}"#).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Decode);
        assert_eq!(err.raw_body(), Some(r#"{"tok": "x"}"#));
    }
}
