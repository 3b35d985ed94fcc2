//! 任务 API

use reqwest::Method;
use tracing::{info, warn};

use crate::error::{ClientError, Result};
use crate::session::Session;
use crate::task::model::{Task, TaskFilter, TaskListing};
use crate::task::poller::{self, WaitOptions};

/// 任务 API
pub struct TaskApi<'a> {
    session: &'a Session,
}

impl<'a> TaskApi<'a> {
    /// 创建新的任务 API 实例
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// 查询任务列表
    pub async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let path = format!("tasks{}", filter.to_query());
        let listing: TaskListing = self
            .session
            .request_json::<(), _>(Method::GET, &path, None)
            .await?;
        Ok(listing.into_tasks())
    }

    /// 获取任务当前快照
    pub async fn get(&self, id: &str) -> Result<Task> {
        self.session
            .request_json::<(), _>(Method::GET, &task_path(id), None)
            .await
    }

    /// 按名称查找任务
    ///
    /// 在当前任务列表中做精确、区分大小写的线性查找，没有匹配时返回 NotFound。
    pub async fn get_by_name(&self, name: &str) -> Result<Task> {
        let tasks = self.list(&TaskFilter::default()).await?;
        tasks
            .into_iter()
            .find(|task| task.name == name)
            .ok_or_else(|| ClientError::not_found(format!("没有名为 {} 的任务", name)))
    }

    /// 强制完成任务
    ///
    /// 管理员操作：服务端直接把任务标记为 Completed，不校验任务的实际进度。
    /// 2xx 即视为成功。等待流程绝不会隐式调用它。
    pub async fn force_complete(&self, id: &str) -> Result<()> {
        warn!("强制完成任务: {} (不校验实际进度)", id);
        self.session
            .request::<()>(Method::PUT, &format!("{}/forcecomplete", task_path(id)), None)
            .await?;
        info!("任务 {} 已被强制完成", id);
        Ok(())
    }

    /// 等待任务进入终态
    pub async fn wait(&self, task: Task, options: &WaitOptions) -> Result<Task> {
        poller::wait_for_task(self.session, task, options).await
    }

    /// 按 ID 等待任务进入终态
    pub async fn wait_by_id(&self, id: &str, options: &WaitOptions) -> Result<Task> {
        poller::wait_for_task_id(self.session, id, options).await
    }
}

fn task_path(id: &str) -> String {
    format!("task/{}", urlencoding::encode(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_path_is_encoded() {
        assert_eq!(task_path("42"), "task/42");
        assert_eq!(task_path("a/b c"), "task/a%2Fb%20c");
    }
}
