//! 登录命令

use anyhow::Result;
use colored::Colorize;

use super::common::create_session;
use super::Context;

pub async fn handle(ctx: &Context) -> Result<()> {
    let session = create_session(&ctx.config).await?;

    if session.is_authenticated() {
        println!(
            "{} 登录成功: {}@{} ({})",
            "✓".green().bold(),
            ctx.config.username.as_deref().unwrap_or("-").cyan(),
            ctx.config.realm,
            ctx.config.host.yellow()
        );
    } else {
        println!(
            "{} {} 为本机地址，无需登录",
            "✓".green().bold(),
            ctx.config.host.yellow()
        );
    }

    Ok(())
}
