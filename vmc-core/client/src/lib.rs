//! VMC 虚拟化平台管理客户端
//!
//! 提供与虚拟化平台管理 API 交互的传输层、会话和长任务处理。
//!
//! # 功能
//!
//! - **会话** (`Session`): 登录、Bearer 令牌、惰性创建的 HTTP 连接池
//! - **传输** (`Transport`): 请求构造与错误分类，可替换为测试用实现
//! - **任务** (`TaskApi`): 查询、按名称查找、强制完成
//! - **等待** (`wait_for_task`): 带截止时间、取消信号和退避重试的轮询
//! - **资源** (`HostApi`, `UserApi`): 主机与用户查询
//!
//! # 示例
//!
//! ```ignore
//! use std::time::Duration;
//! use vmc_client::{ClientConfig, JoinRoute, Session, WaitOptions};
//!
//! let mut session = Session::new(ClientConfig::new("mgmt.lab", 443));
//! session.login("admin", "password", "local").await?;
//!
//! // 主机加入集群，等待任务完成
//! let task = session
//!     .host()
//!     .join_cluster("node-3", "c1", JoinRoute::ClusterInBody)
//!     .await?;
//!
//! let options = WaitOptions::default()
//!     .with_timeout(Duration::from_secs(600))
//!     .report_progress(true);
//! let done = session.task().wait(task, &options).await?;
//! ```

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod task;
pub mod transport;

pub use session::{is_loopback_host, Session};
pub use config::{ClientConfig, RetryPolicy, TaskWaitConfig, DEFAULT_API_PORT, DEV_PLAINTEXT_PORT};
pub use error::{ClientError, ErrorKind, Result};
pub use transport::{ApiRequest, HttpTransport, Transport};

// 导出 API 模块
pub use api::{host::HostApi, user::UserApi};
pub use task::{
    wait_for_task, wait_for_task_id, ProgressSink, Task, TaskApi, TaskFilter, TaskProgress,
    TaskState, WaitOptions,
};

// 导出数据模型
pub use models::{FlexValue, Host, JoinClusterRequest, JoinRoute, User};

// 调用方构造请求和取消信号时使用
pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;
