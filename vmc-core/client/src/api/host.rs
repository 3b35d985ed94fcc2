//! 主机管理 API

use reqwest::Method;
use tracing::info;

use crate::error::Result;
use crate::models::{Host, JoinClusterRequest, JoinRoute};
use crate::session::Session;
use crate::task::Task;

/// 主机管理 API
pub struct HostApi<'a> {
    session: &'a Session,
}

impl<'a> HostApi<'a> {
    /// 创建新的主机 API 实例
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// 查询主机列表
    pub async fn list(&self) -> Result<Vec<Host>> {
        info!("查询主机列表");
        self.session
            .request_json::<(), _>(Method::GET, "hosts", None)
            .await
    }

    /// 查询主机详情
    pub async fn get(&self, host_id: &str) -> Result<Host> {
        info!("查询主机详情: {}", host_id);
        self.session
            .request_json::<(), _>(Method::GET, &host_path(host_id), None)
            .await
    }

    /// 主机加入集群，返回服务端创建的任务
    ///
    /// 两种路径形式都存在于服务端的不同版本中，`route` 必须由调用方明确指定。
    pub async fn join_cluster(
        &self,
        host_id: &str,
        cluster_id: &str,
        route: JoinRoute,
    ) -> Result<Task> {
        info!("主机 {} 加入集群 {} ({:?})", host_id, cluster_id, route);
        match route {
            JoinRoute::ClusterInPath => {
                let path = format!(
                    "{}/join/{}",
                    host_path(host_id),
                    urlencoding::encode(cluster_id)
                );
                self.session
                    .request_json::<(), _>(Method::POST, &path, None)
                    .await
            }
            JoinRoute::ClusterInBody => {
                let body = JoinClusterRequest {
                    cluster_id: cluster_id.to_string(),
                };
                let path = format!("{}/join", host_path(host_id));
                self.session
                    .request_json(Method::POST, &path, Some(&body))
                    .await
            }
        }
    }

    /// 移除主机
    ///
    /// 服务端约定为 `POST .../delete`，而不是 `DELETE` 方法。
    pub async fn remove(&self, host_id: &str) -> Result<()> {
        info!("移除主机: {}", host_id);
        self.session
            .request::<()>(Method::POST, &format!("{}/delete", host_path(host_id)), None)
            .await?;
        Ok(())
    }
}

fn host_path(host_id: &str) -> String {
    format!("host/{}", urlencoding::encode(host_id))
}
