//! VMC CLI 应用

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vmc_client::{ClientError, ErrorKind};

mod commands;
mod config;

use commands::output::OutputFormat;
use commands::Context;
use config::CliConfig;

#[derive(Parser)]
#[command(name = "vmc")]
#[command(about = "VMC - 虚拟化平台管理命令行工具", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 管理节点地址
    #[arg(long)]
    host: Option<String>,

    /// 管理 API 端口
    #[arg(long)]
    port: Option<u16>,

    /// 跳过 TLS 证书校验
    #[arg(long)]
    insecure: bool,

    /// 日志级别 (trace/debug/info/warn/error)，可被 RUST_LOG 覆盖
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// 输出格式
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 登录验证凭据
    Login,

    /// 任务管理
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// 主机管理
    Host {
        #[command(subcommand)]
        action: HostAction,
    },

    /// 用户管理
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// 列出任务
    List {
        /// 状态过滤 (queued/running/completed/failed/cancelled)
        #[arg(short, long)]
        state: Option<String>,

        /// 主机过滤
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// 限制数量
        #[arg(short = 'n', long)]
        limit: Option<u32>,
    },

    /// 显示任务详情
    Show {
        /// 任务 ID
        id: String,
    },

    /// 等待任务结束
    Wait {
        /// 任务 ID
        #[arg(required_unless_present = "name", conflicts_with = "name")]
        id: Option<String>,

        /// 按任务名称查找（精确匹配）
        #[arg(long)]
        name: Option<String>,

        /// 最长等待时间（秒）
        #[arg(short, long)]
        timeout: Option<u64>,

        /// 轮询间隔（毫秒）
        #[arg(short, long)]
        interval: Option<u64>,

        /// 单次拉取的最大尝试次数
        #[arg(short, long)]
        retries: Option<u32>,

        /// 不显示进度条
        #[arg(short, long)]
        quiet: bool,
    },

    /// 强制标记任务完成（不校验实际进度）
    ForceComplete {
        /// 任务 ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum HostAction {
    /// 列出主机
    List,

    /// 显示主机详情
    Show {
        /// 主机 ID
        id: String,
    },

    /// 主机加入集群
    Join {
        /// 主机 ID
        host: String,

        /// 集群 ID
        cluster: String,

        /// 请求形式：集群 ID 放在路径中或请求体中
        #[arg(long, value_enum)]
        route: JoinRouteArg,
    },

    /// 移除主机
    Remove {
        /// 主机 ID
        id: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum JoinRouteArg {
    /// POST host/{host}/join/{cluster}
    Path,
    /// POST host/{host}/join，请求体 {"clusterId": ...}
    Body,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// 列出用户
    List,

    /// 显示用户详情
    Show {
        /// 用户名
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "✗".red().bold(), err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.apply_flags(cli.host, cli.port, cli.insecure);
    config.validate()?;

    debug!("目标: {}:{}", config.host, config.port);

    let ctx = Context {
        config,
        format: cli.output,
    };

    // 处理命令
    match cli.command {
        Commands::Login => commands::login::handle(&ctx).await?,
        Commands::Task { action } => commands::task::handle(action, &ctx).await?,
        Commands::Host { action } => commands::host::handle(action, &ctx).await?,
        Commands::User { action } => commands::user::handle(action, &ctx).await?,
    }

    Ok(())
}

/// 按错误类别映射进程退出码
fn exit_code(err: &anyhow::Error) -> u8 {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ClientError>())
        .map(ClientError::kind);

    match kind {
        Some(ErrorKind::Transport) => 10,
        Some(ErrorKind::Auth) => 11,
        Some(ErrorKind::Validation) => 12,
        Some(ErrorKind::NotFound) => 13,
        Some(ErrorKind::Server) => 14,
        Some(ErrorKind::TaskFailed) => 15,
        Some(ErrorKind::TaskCancelled) => 16,
        Some(ErrorKind::Timeout) => 17,
        Some(ErrorKind::Decode) => 18,
        None => 1,
    }
}
