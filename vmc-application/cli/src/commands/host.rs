//! 主机管理命令

use anyhow::Result;
use colored::Colorize;
use vmc_client::JoinRoute;

use super::common::create_session;
use super::output::{output_item, output_list, OutputFormat};
use super::Context;
use crate::{HostAction, JoinRouteArg};

pub async fn handle(action: HostAction, ctx: &Context) -> Result<()> {
    let session = create_session(&ctx.config).await?;

    match action {
        HostAction::List => {
            let hosts = session.host().list().await?;
            if hosts.is_empty() && ctx.format == OutputFormat::Table {
                println!("{}", "没有任何主机".yellow());
                return Ok(());
            }
            output_list(&hosts, ctx.format)
        }
        HostAction::Show { id } => {
            let host = session.host().get(&id).await?;
            output_item(&host, ctx.format)
        }
        HostAction::Join {
            host,
            cluster,
            route,
        } => {
            let task = session
                .host()
                .join_cluster(&host, &cluster, join_route(route))
                .await?;

            if ctx.format == OutputFormat::Table {
                println!(
                    "{} 主机 {} 加入集群 {} 的任务已提交: {}",
                    "✓".green().bold(),
                    host.cyan().bold(),
                    cluster.cyan().bold(),
                    task.id.yellow()
                );
                println!("\n使用以下命令等待完成:");
                println!("  {} vmc task wait {}", "$".bright_black(), task.id);
                Ok(())
            } else {
                output_item(&task, ctx.format)
            }
        }
        HostAction::Remove { id } => {
            session.host().remove(&id).await?;
            println!("{} 主机 {} 已移除", "✓".green().bold(), id.cyan().bold());
            Ok(())
        }
    }
}

fn join_route(arg: JoinRouteArg) -> JoinRoute {
    match arg {
        JoinRouteArg::Path => JoinRoute::ClusterInPath,
        JoinRouteArg::Body => JoinRoute::ClusterInBody,
    }
}
