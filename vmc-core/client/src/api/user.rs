//! 用户管理 API

use reqwest::Method;
use tracing::info;

use crate::error::Result;
use crate::models::User;
use crate::session::Session;

/// 用户管理 API
pub struct UserApi<'a> {
    session: &'a Session,
}

impl<'a> UserApi<'a> {
    /// 创建新的用户 API 实例
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// 查询用户列表
    pub async fn list(&self) -> Result<Vec<User>> {
        info!("查询用户列表");
        self.session
            .request_json::<(), _>(Method::GET, "users", None)
            .await
    }

    /// 查询用户详情
    pub async fn get(&self, name: &str) -> Result<User> {
        info!("查询用户详情: {}", name);
        self.session
            .request_json::<(), _>(
                Method::GET,
                &format!("user/{}", urlencoding::encode(name)),
                None,
            )
            .await
    }
}
