//! CLI 通用输出格式化模块
//!
//! 提供 table/json/yaml 三种输出格式的通用实现

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::ValueEnum;
use serde::Serialize;
use vmc_client::{Host, Task, User};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

/// 可输出为表格行的数据 trait
pub trait TableRow {
    /// 返回表格列标题
    fn headers() -> Vec<&'static str>;

    /// 返回该项的表格行数据
    fn row(&self) -> Vec<String>;
}

/// 按列宽对齐后的表格文本（表头、分隔线、数据行）
pub fn render_table<T: TableRow>(items: &[T]) -> Vec<String> {
    let headers = T::headers();
    let rows: Vec<Vec<String>> = items.iter().map(TableRow::row).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(display_width(cell));
            }
        }
    }

    let format_line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad(c, *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header_line = format_line(headers.iter().map(|h| h.to_string()).collect());
    let separator = "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1));

    let mut lines = vec![header_line, separator];
    lines.extend(rows.into_iter().map(format_line));
    lines
}

/// 表格格式输出
pub fn print_table<T: TableRow>(items: &[T]) {
    for line in render_table(items) {
        println!("{}", line);
    }
}

/// JSON 格式输出
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// YAML 格式输出
pub fn print_yaml<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    print!("{}", serde_yaml::to_string(value)?);
    Ok(())
}

/// 按格式输出列表
pub fn output_list<T: TableRow + Serialize>(items: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(items),
        OutputFormat::Yaml => print_yaml(items),
        OutputFormat::Table => {
            print_table(items);
            Ok(())
        }
    }
}

/// 按格式输出单项
pub fn output_item<T: TableRow + Serialize>(item: &T, format: OutputFormat) -> Result<()> {
    output_list(std::slice::from_ref(item), format)
}

// 中文字符按两列宽计算
fn display_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(s));
    format!("{}{}", s, " ".repeat(fill))
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

impl TableRow for Task {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "名称", "状态", "进度", "开始时间", "消息"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.state.display_name().to_string(),
            format!("{}%", self.progress),
            format_time(self.start_time),
            or_dash(self.message.as_deref()),
        ]
    }
}

impl TableRow for Host {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "名称", "地址", "集群", "状态", "证书过期"]
    }

    fn row(&self) -> Vec<String> {
        let cert = match self.cert_expires_at() {
            Some(at) => format_time(Some(at)),
            None => self.cert_expiration.to_string(),
        };
        vec![
            self.id.clone(),
            self.name.clone(),
            or_dash(self.address.as_deref()),
            or_dash(self.cluster.as_deref()),
            or_dash(self.state.as_deref()),
            cert,
        ]
    }
}

impl TableRow for User {
    fn headers() -> Vec<&'static str> {
        vec!["用户名", "认证域", "邮箱", "组织单位"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            or_dash(self.realm.as_deref()),
            or_dash(self.email.as_deref()),
            self.organizational_unit.to_string(),
        ]
    }
}
