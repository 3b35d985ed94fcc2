//! 传输层
//!
//! [`Transport`] 是会话与网络之间的接缝：生产环境使用基于 reqwest 的
//! [`HttpTransport`]，测试中可以注入脚本化的假实现。
//!
//! 传输层从不重试，重试策略只属于任务轮询。

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use tracing::{debug, warn};

use crate::classify::{classify_connection, classify_response};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// 一次 API 调用
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,

    /// `/api/` 之后的相对路径，可带查询串
    pub path: String,

    /// 已序列化的 JSON 请求体
    pub body: Option<Vec<u8>>,

    /// Bearer 令牌，未登录时为空
    pub token: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            token: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// 执行 API 调用并完成错误分类
///
/// 实现必须：2xx 返回响应体，其余状态码和连接失败返回分类后的 [`ClientError`]。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<Bytes>;
}

/// 基于 reqwest 的传输实现
///
/// 内部的连接池在构造时按 TLS 设置创建，之后不可修改。
pub struct HttpTransport {
    /// `scheme://host:port/api`
    base_url: String,

    /// HTTP 客户端
    http_client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .map_err(|e| ClientError::transport(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            base_url: config.base_url(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Bytes> {
        let url = self.url_for(&request.path);
        debug!(method = %request.method, %url, "发送 API 请求");

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| classify_connection(&e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| classify_connection(&e))?;

        if !status.is_success() {
            warn!(
                "API 请求失败: {} {} - {} {}",
                request.method,
                url,
                status,
                String::from_utf8_lossy(&body)
            );
            return Err(classify_response(status.as_u16(), &body));
        }

        debug!(method = %request.method, %url, %status, bytes = body.len(), "收到 API 响应");
        Ok(body)
    }
}
