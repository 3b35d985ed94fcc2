//! 资源 API 模块
//!
//! - 主机管理 (HostApi)
//! - 用户管理 (UserApi)
//!
//! 任务相关 API 见 [`crate::task`]。

pub mod host;
pub mod user;

pub use host::HostApi;
pub use user::UserApi;
