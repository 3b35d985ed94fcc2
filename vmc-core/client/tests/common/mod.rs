//! 测试公共工具：脚本化的传输实现

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use vmc_client::{ApiRequest, ClientConfig, ClientError, Result, Session, Transport};

/// 按脚本依次返回响应，并记录收到的每个请求
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Bytes>>>,
    fallback: Mutex<Option<Result<Bytes>>>,
    delay: Mutex<Option<Duration>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_json(&self, value: Value) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(Bytes::from(value.to_string())));
    }

    pub fn push_empty(&self) {
        self.script.lock().unwrap().push_back(Ok(Bytes::new()));
    }

    pub fn push_error(&self, err: ClientError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    /// 脚本耗尽后一直返回该响应
    pub fn repeat_json(&self, value: Value) {
        *self.fallback.lock().unwrap() = Some(Ok(Bytes::from(value.to_string())));
    }

    /// 每个请求在返回前等待的时间
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Bytes> {
        self.requests.lock().unwrap().push(request);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => self
                .fallback
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(ClientError::decode("测试脚本已耗尽"))),
        }
    }
}

pub fn session_for(host: &str, transport: &Arc<ScriptedTransport>) -> Session {
    Session::with_transport(ClientConfig::new(host, 443), transport.clone())
}

pub fn remote_session(transport: &Arc<ScriptedTransport>) -> Session {
    session_for("mgmt.lab", transport)
}

pub fn task_json(id: &str, state: &str, progress: u8) -> Value {
    json!({
        "id": id,
        "name": format!("task-{}", id),
        "state": state,
        "progress": progress,
        "message": format!("{} at {}%", state, progress),
        "cancellable": true
    })
}

pub fn transport_error() -> ClientError {
    ClientError::transport("连接失败 https://mgmt.lab:443/api/task/t1: connection reset")
}
