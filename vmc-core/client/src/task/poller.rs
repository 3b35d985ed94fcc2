//! 任务轮询
//!
//! 把"操作已受理但尚未完成"转换成确定的等待结果：
//!
//! - 终态立即停止：Completed 返回任务，Failed / Cancelled 返回对应错误
//! - 可重试的拉取失败按 [`RetryPolicy`] 退避重试，不可重试的错误原样返回
//! - 每次拉取之前、每次休眠之前都检查截止时间和取消信号；休眠和进行中的请求
//!   都与这两个信号竞争，触发后丢弃请求 future，不会再有任何网络活动
//! - 进度通知只是旁路输出，不影响控制流

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{RetryPolicy, TaskWaitConfig};
use crate::error::{ClientError, Result};
use crate::session::Session;
use crate::task::model::{Task, TaskProgress};

/// 进度通知接收方
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: &TaskProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&TaskProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &TaskProgress) {
        self(progress)
    }
}

/// 等待选项
#[derive(Clone)]
pub struct WaitOptions {
    /// 轮询间隔
    pub poll_interval: Duration,

    /// 单次拉取失败时的重试策略
    pub retry: RetryPolicy,

    /// 截止时间
    pub deadline: Option<Instant>,

    /// 外部取消信号
    pub cancel: Option<CancellationToken>,

    /// 是否输出进度通知
    pub report_progress: bool,

    /// 进度接收方；未设置时进度写入日志
    pub progress_sink: Option<Arc<dyn ProgressSink>>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::from_config(&TaskWaitConfig::default())
    }
}

impl fmt::Debug for WaitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitOptions")
            .field("poll_interval", &self.poll_interval)
            .field("retry", &self.retry)
            .field("deadline", &self.deadline)
            .field("cancel", &self.cancel)
            .field("report_progress", &self.report_progress)
            .field("progress_sink", &self.progress_sink.is_some())
            .finish()
    }
}

impl WaitOptions {
    pub fn from_config(config: &TaskWaitConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            retry: config.retry.clone(),
            deadline: None,
            cancel: None,
            report_progress: false,
            progress_sink: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// 从现在起 `timeout` 之后截止
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn report_progress(mut self, enabled: bool) -> Self {
        self.report_progress = enabled;
        self
    }

    /// 设置进度接收方并开启进度通知
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = Some(sink);
        self.report_progress = true;
        self
    }
}

/// 等待任务进入终态
///
/// 传入的快照已是终态时立即返回，不发起任何请求。
pub async fn wait_for_task(session: &Session, task: Task, options: &WaitOptions) -> Result<Task> {
    let id = task.id.clone();
    let state = task.state;
    match task.terminal_outcome() {
        Some(outcome) => {
            debug!("任务 {} 已处于终态 {}，无需轮询", id, state);
            outcome
        }
        None => wait_for_task_id(session, &id, options).await,
    }
}

/// 按任务 ID 等待，第一次拉取立即发生
pub async fn wait_for_task_id(session: &Session, id: &str, options: &WaitOptions) -> Result<Task> {
    let waiter = Waiter {
        session,
        id,
        options,
        started: Instant::now(),
    };
    waiter.run().await
}

struct Waiter<'a> {
    session: &'a Session,
    id: &'a str,
    options: &'a WaitOptions,
    started: Instant,
}

impl Waiter<'_> {
    async fn run(&self) -> Result<Task> {
        info!("等待任务完成: {}", self.id);
        let mut polls = 0u32;

        loop {
            let task = self.fetch_with_retry().await?;
            polls += 1;
            debug!(
                "任务 {} 第 {} 次轮询: {} {}%",
                self.id, polls, task.state, task.progress
            );

            self.report(&task);

            let state = task.state;
            if let Some(outcome) = task.terminal_outcome() {
                info!(
                    "任务 {} 结束: {} (轮询 {} 次, 耗时 {:?})",
                    self.id,
                    state.display_name(),
                    polls,
                    self.started.elapsed()
                );
                return outcome;
            }

            self.sleep(self.options.poll_interval).await?;
        }
    }

    /// 拉取一次任务快照，可重试错误按策略退避重试
    async fn fetch_with_retry(&self) -> Result<Task> {
        let max_attempts = self.options.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            self.check_stop()?;
            attempt += 1;

            match self.guard(self.session.task().get(self.id)).await {
                Ok(task) => return Ok(task),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.options.retry.calculate_delay(attempt - 1);
                    warn!(
                        "拉取任务 {} 失败 (第 {}/{} 次): {}，{:?} 后重试",
                        self.id, attempt, max_attempts, err, delay
                    );
                    self.sleep(delay).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn report(&self, task: &Task) {
        if !self.options.report_progress {
            return;
        }
        let progress = task.progress_update();
        match &self.options.progress_sink {
            Some(sink) => sink.on_progress(&progress),
            None => info!(
                "任务 {} [{}] {}% {}",
                progress.id,
                progress.state.display_name(),
                progress.progress,
                progress.message.as_deref().unwrap_or("")
            ),
        }
    }

    /// 截止时间或取消信号已触发时返回对应错误
    fn check_stop(&self) -> Result<()> {
        if let Some(token) = &self.options.cancel {
            if token.is_cancelled() {
                return Err(self.cancelled());
            }
        }
        if let Some(deadline) = self.options.deadline {
            if Instant::now() >= deadline {
                return Err(self.timed_out());
            }
        }
        Ok(())
    }

    /// 可被截止时间和取消信号打断的休眠
    async fn sleep(&self, duration: Duration) -> Result<()> {
        self.check_stop()?;
        self.guard(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }

    /// 让 `fut` 与截止时间、取消信号竞争；信号先到时丢弃 `fut`
    async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let cancel = self.options.cancel.clone();
        let deadline = self.options.deadline;

        tokio::select! {
            biased;
            _ = wait_cancelled(cancel.as_ref()) => Err(self.cancelled()),
            _ = wait_deadline(deadline) => Err(self.timed_out()),
            result = fut => result,
        }
    }

    fn cancelled(&self) -> ClientError {
        warn!("等待任务 {} 被取消", self.id);
        ClientError::TaskCancelled {
            id: self.id.to_string(),
            message: "等待被调用方取消".to_string(),
        }
    }

    fn timed_out(&self) -> ClientError {
        let waited = self.started.elapsed();
        warn!("等待任务 {} 超时 ({:?})", self.id, waited);
        ClientError::Timeout {
            id: self.id.to_string(),
            waited,
        }
    }
}

async fn wait_cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
