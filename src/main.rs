//! rsxss 命令行：加载安全过滤配置并检查请求内容

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rsxss::{ConfigManager, RequestView, SecurityManager};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rsxss", version, about = "基于正则规则的请求内容安全过滤工具")]
struct Cli {
    /// 配置标识（路径、classpath:xxx 或 file: URL）
    #[arg(short, long, default_value = "xss_security_config.xml")]
    config: String,

    /// 相对路径与 classpath: 的根目录
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// 命中内容的替换标记
    #[arg(long)]
    replacement: Option<String>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 检查配置文件并输出加载摘要
    Check,
    /// 按策略开关检查一个请求，输出判定结果（JSON）
    Scan {
        /// 请求URI，查询串会解析为参数
        #[arg(long, default_value = "/")]
        url: String,
        /// Header，格式 name=value，可重复
        #[arg(long = "header", value_parser = parse_pair)]
        headers: Vec<(String, String)>,
        /// 参数，格式 name=value，可重复
        #[arg(long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
    },
    /// 用兜底正则替换文本中的命中片段
    Sanitize { text: String },
    /// 兜底正则整串匹配
    Matches { text: String },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("期望 name=value 格式：{}", s))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "rsxss=debug" } else { "rsxss=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut builder = ConfigManager::custom().base_dir(cli.base_dir.clone());
    if let Some(replacement) = cli.replacement.clone() {
        builder = builder.replacement(replacement);
    }
    let manager = SecurityManager::new(builder.build());
    let report = manager
        .init(&cli.config)
        .with_context(|| format!("加载安全过滤配置失败：{}", cli.config))?;

    match cli.command {
        Command::Check => {
            println!("规则数：{}", report.rule_count);
            println!("白名单数：{}", report.exempt_url_count);
            println!("兜底正则：{}", if report.catch_all_enabled { "已启用" } else { "未启用" });
            println!("策略：{}", serde_json::to_string(&report.flags)?);
            for warning in &report.warnings {
                println!("告警：{}", warning);
            }
        }
        Command::Scan { url, headers, params } => {
            let mut view = RequestView::from_uri(&url);
            for (name, value) in headers {
                view = view.with_header(name, value);
            }
            for (name, value) in params {
                view = view.with_parameter(name, value);
            }

            let verdict = manager.evaluate(&mut view);
            let output = json!({ "result": &verdict, "request": &view });
            println!("{}", serde_json::to_string_pretty(&output)?);

            if verdict.is_reject() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Sanitize { text } => {
            println!("{}", manager.sanitize(Some(&text)).unwrap_or_default());
        }
        Command::Matches { text } => {
            println!("{}", manager.matches(Some(&text)));
        }
    }

    Ok(ExitCode::SUCCESS)
}
