//! 用户管理命令

use anyhow::Result;
use colored::Colorize;

use super::common::create_session;
use super::output::{output_item, output_list, OutputFormat};
use super::Context;
use crate::UserAction;

pub async fn handle(action: UserAction, ctx: &Context) -> Result<()> {
    let session = create_session(&ctx.config).await?;

    match action {
        UserAction::List => {
            let users = session.user().list().await?;
            if users.is_empty() && ctx.format == OutputFormat::Table {
                println!("{}", "没有任何用户".yellow());
                return Ok(());
            }
            output_list(&users, ctx.format)
        }
        UserAction::Show { name } => {
            let user = session.user().get(&name).await?;
            output_item(&user, ctx.format)
        }
    }
}
