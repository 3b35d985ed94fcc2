//! 公共工具函数模块
//!
//! 提供各命令模块共享的会话创建与登录

use anyhow::{Context, Result};
use tracing::info;
use vmc_client::Session;

use crate::config::CliConfig;

/// 创建会话并登录
///
/// 目标为本机地址时不需要凭据；否则必须配置用户名和密码。
pub async fn create_session(config: &CliConfig) -> Result<Session> {
    let mut session = Session::new(config.client_config());

    if session.is_loopback() {
        info!("目标为本机地址，跳过登录");
        return Ok(session);
    }

    let (username, password) = match (&config.username, &config.password) {
        (Some(username), Some(password)) => (username, password),
        _ => anyhow::bail!("未配置登录凭据，请设置 VMC_USERNAME / VMC_PASSWORD 或写入配置文件"),
    };

    session
        .login(username, password, &config.realm)
        .await
        .with_context(|| format!("登录 {} 失败", config.host))?;

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loopback_needs_no_credentials() {
        let config = CliConfig {
            host: "127.0.0.1".into(),
            ..Default::default()
        };
        let session = create_session(&config).await.unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_remote_requires_credentials() {
        let config = CliConfig {
            host: "mgmt.lab".into(),
            username: Some("admin".into()),
            ..Default::default()
        };
        let err = create_session(&config).await.unwrap_err();
        assert!(err.to_string().contains("VMC_PASSWORD"));
    }
}
