//! 任务管理命令

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use vmc_client::{
    CancellationToken, ClientError, RetryPolicy, Session, Task, TaskFilter, TaskProgress,
    TaskState, WaitOptions,
};

use super::common::create_session;
use super::output::{output_item, output_list, OutputFormat};
use super::Context;
use crate::TaskAction;

pub async fn handle(action: TaskAction, ctx: &Context) -> Result<()> {
    let session = create_session(&ctx.config).await?;

    match action {
        TaskAction::List { state, host, limit } => {
            let filter = build_filter(state.as_deref(), host, limit)?;
            let tasks = session.task().list(&filter).await?;
            if tasks.is_empty() && ctx.format == OutputFormat::Table {
                println!("{}", "没有匹配的任务".yellow());
                return Ok(());
            }
            output_list(&tasks, ctx.format)
        }
        TaskAction::Show { id } => {
            let task = session.task().get(&id).await?;
            output_item(&task, ctx.format)
        }
        TaskAction::Wait {
            id,
            name,
            timeout,
            interval,
            retries,
            quiet,
        } => {
            let args = WaitArgs {
                timeout,
                interval,
                retries,
                quiet,
            };
            wait(&session, ctx, id, name, args).await
        }
        TaskAction::ForceComplete { id } => {
            println!(
                "{} 强制完成不会校验任务的实际进度，任务 {} 将直接被标记为已完成",
                "⚠".yellow().bold(),
                id.cyan()
            );
            session.task().force_complete(&id).await?;
            println!("{} 任务 {} 已被强制完成", "✓".green().bold(), id.cyan().bold());
            Ok(())
        }
    }
}

struct WaitArgs {
    timeout: Option<u64>,
    interval: Option<u64>,
    retries: Option<u32>,
    quiet: bool,
}

fn build_filter(
    state: Option<&str>,
    host: Option<String>,
    limit: Option<u32>,
) -> Result<TaskFilter> {
    let mut filter = TaskFilter::default();
    if let Some(state) = state {
        let state: TaskState = state.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        filter = filter.with_state(state);
    }
    if let Some(host) = host {
        filter = filter.with_host(host);
    }
    if let Some(limit) = limit {
        filter = filter.with_limit(limit);
    }
    Ok(filter)
}

fn wait_options(ctx: &Context, args: &WaitArgs, cancel: CancellationToken) -> WaitOptions {
    let mut options = WaitOptions::from_config(&ctx.config.wait).with_cancel(cancel);

    if let Some(interval) = args.interval {
        options = options.with_poll_interval(Duration::from_millis(interval));
    }
    if let Some(retries) = args.retries {
        let retry: RetryPolicy = ctx.config.wait.retry.clone().with_max_attempts(retries);
        options = options.with_retry(retry);
    }
    if let Some(timeout) = args.timeout {
        options = options.with_timeout(Duration::from_secs(timeout));
    }
    options
}

async fn wait(
    session: &Session,
    ctx: &Context,
    id: Option<String>,
    name: Option<String>,
    args: WaitArgs,
) -> Result<()> {
    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let mut options = wait_options(ctx, &args, cancel.clone());

    let bar = if args.quiet || ctx.format != OutputFormat::Table {
        None
    } else {
        let bar = progress_bar()?;
        let sink = bar.clone();
        options = options.with_progress_sink(Arc::new(move |p: &TaskProgress| {
            sink.set_position(u64::from(p.progress));
            sink.set_message(format!(
                "{} {}",
                p.state.display_name(),
                p.message.as_deref().unwrap_or("")
            ));
        }));
        Some(bar)
    };

    let result = match (id, name) {
        (_, Some(name)) => {
            let task = find_by_name(session, &name, &cancel)
                .await
                .with_context(|| format!("查找任务 {} 失败", name))?;
            if let Some(bar) = &bar {
                bar.set_prefix(task.id.clone());
            }
            session.task().wait(task, &options).await
        }
        (Some(id), None) => {
            if let Some(bar) = &bar {
                bar.set_prefix(id.clone());
            }
            session.task().wait_by_id(&id, &options).await
        }
        (None, None) => anyhow::bail!("需要指定任务 ID 或 --name"),
    };

    match result {
        Ok(task) => {
            if let Some(bar) = &bar {
                bar.finish_with_message(format!("{}", "已完成".green()));
            }
            report_done(&task, ctx.format)
        }
        Err(err) => {
            if let Some(bar) = &bar {
                bar.abandon_with_message(format!("{}", err.kind().to_string().red()));
            }
            Err(err.into())
        }
    }
}

/// 按名称查找任务，查找过程可被 Ctrl-C 打断
async fn find_by_name(
    session: &Session,
    name: &str,
    cancel: &CancellationToken,
) -> std::result::Result<Task, ClientError> {
    let tasks = session.task();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::TaskCancelled {
            id: name.to_string(),
            message: "查找被中断".to_string(),
        }),
        found = tasks.get_by_name(name) => found,
    }
}

fn report_done(task: &Task, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!(
                "{} 任务 {} 已完成",
                "✓".green().bold(),
                task.id.cyan().bold()
            );
            Ok(())
        }
        _ => output_item(task, format),
    }
}

fn progress_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("=>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

/// Ctrl-C 触发取消信号，等待流程随即以 TaskCancelled 结束
fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，取消等待");
            cancel.cancel();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use vmc_client::{ClientConfig, ErrorKind};

    fn ctx() -> Context {
        Context {
            config: CliConfig {
                host: "mgmt.lab".into(),
                ..Default::default()
            },
            format: OutputFormat::Table,
        }
    }

    #[tokio::test]
    async fn test_find_by_name_cancelled_before_request() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let session = Session::new(ClientConfig::new("mgmt.lab", 443));
        let err = find_by_name(&session, "join", &cancel).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TaskCancelled);
    }

    #[tokio::test]
    async fn test_find_by_name_interrupted_while_hanging() {
        // 监听但从不应答，请求会一直挂起直到客户端超时
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let session = Session::new(ClientConfig::new("127.0.0.1", port).with_plaintext_port(port));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            find_by_name(&session, "join", &cancel),
        )
        .await
        .expect("查找没有被及时打断");

        assert_eq!(result.unwrap_err().kind(), ErrorKind::TaskCancelled);
        drop(listener);
    }

    #[test]
    fn test_build_filter() {
        let filter = build_filter(Some("Running"), Some("node-1".into()), Some(5)).unwrap();
        assert_eq!(filter.to_query(), "?state=running&host=node-1&limit=5");

        assert!(build_filter(Some("paused"), None, None).is_err());
        assert_eq!(build_filter(None, None, None).unwrap().to_query(), "");
    }

    #[tokio::test]
    async fn test_wait_options_from_args() {
        let args = WaitArgs {
            timeout: Some(60),
            interval: Some(250),
            retries: Some(5),
            quiet: true,
        };
        let cancel = CancellationToken::new();
        let options = wait_options(&ctx(), &args, cancel.clone());

        assert_eq!(options.poll_interval, Duration::from_millis(250));
        assert_eq!(options.retry.max_attempts, 5);
        assert!(options.deadline.is_some());
        assert!(!options.report_progress);

        cancel.cancel();
        assert!(options.cancel.unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_options_defaults() {
        let args = WaitArgs {
            timeout: None,
            interval: None,
            retries: None,
            quiet: false,
        };
        let options = wait_options(&ctx(), &args, CancellationToken::new());

        assert_eq!(options.poll_interval, Duration::from_millis(1000));
        assert_eq!(options.retry.max_attempts, 3);
        assert!(options.deadline.is_none());
    }
}
