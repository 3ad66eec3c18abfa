//! singbox-builder 命令行入口
//! 读取节点与规则选项，编译 sing-box 配置并写出 JSON

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use singbox_builder::utils::split_comma_list;
use singbox_builder::{
    BaseTemplate, CompileRequest, ConfigCompiler, ConfigManager, CustomRule, Locale, Preset,
    ProxyDescriptor, RuleSelection,
};

/// 生成 sing-box 客户端配置
#[derive(Parser, Debug)]
#[command(name = "singbox-builder", version, about = "Build sing-box client configurations")]
struct Cli {
    /// 节点文件：sing-box 出站数组，或含 outbounds 字段的配置
    #[arg(short = 'p', long = "proxies", value_name = "FILE")]
    proxies: PathBuf,

    /// 逗号分隔的规则分类
    #[arg(short = 'r', long = "rules", conflicts_with = "preset")]
    rules: Option<String>,

    /// 规则预设：minimal / balanced / comprehensive
    #[arg(long = "preset")]
    preset: Option<Preset>,

    /// 自定义规则文件（JSON 数组）
    #[arg(long = "custom-rules", value_name = "FILE")]
    custom_rules: Option<PathBuf>,

    /// 界面语言：zh-CN / en-US
    #[arg(short = 'l', long = "lang", default_value = "zh-CN")]
    lang: String,

    /// 自定义基础模板
    #[arg(short = 't', long = "template", value_name = "FILE")]
    template: Option<PathBuf>,

    /// GitHub 加速前缀，拼接在规则集地址前
    #[arg(long = "gh-proxy")]
    gh_proxy: Option<String>,

    /// 规则集下载出站
    #[arg(long = "download-detour")]
    download_detour: Option<String>,

    /// 输出文件，缺省写到标准输出
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    // 1. 组装配置
    let mut builder = ConfigManager::custom().locale(Locale::parse_lossy(&cli.lang));
    if let Some(gh_proxy) = cli.gh_proxy {
        builder = builder.gh_proxy_url(gh_proxy);
    }
    if let Some(detour) = cli.download_detour {
        builder = builder.rule_set_download_detour(detour);
    }
    let mut compiler = ConfigCompiler::new(builder.build())?;

    if let Some(path) = &cli.template {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read template {}", path.display()))?;
        compiler = compiler.with_template(BaseTemplate::from_json(&raw)?);
    }

    // 2. 读取输入
    let proxies = read_proxies(&cli.proxies).await?;
    let custom_rules = match &cli.custom_rules {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("read custom rules {}", path.display()))?;
            serde_json::from_str::<Vec<CustomRule>>(&raw)
                .with_context(|| format!("parse custom rules {}", path.display()))?
        }
        None => Vec::new(),
    };
    let selection = match (cli.preset, cli.rules) {
        (Some(preset), _) => RuleSelection::Preset(preset),
        (None, Some(rules)) => RuleSelection::Categories(split_comma_list(&rules)),
        (None, None) => RuleSelection::default(),
    };

    // 3. 编译并输出
    let request = CompileRequest::new(proxies)
        .selection(selection)
        .custom_rules(custom_rules);
    let value = compiler.compile_value(&request)?;
    let mut rendered = serde_json::to_string_pretty(&value)?;
    rendered.push('\n');

    match &cli.output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("write {}", path.display()))?;
            info!("配置已写入 {}", path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(rendered.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

async fn read_proxies(path: &PathBuf) -> Result<Vec<ProxyDescriptor>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read proxies {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("parse proxies {}", path.display()))?;

    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut root) => match root.remove("outbounds") {
            Some(Value::Array(items)) => items,
            _ => bail!("{} 中缺少 outbounds 数组", path.display()),
        },
        _ => bail!("{} 必须是出站数组或含 outbounds 的对象", path.display()),
    };

    let proxies = list
        .into_iter()
        .map(serde_json::from_value::<ProxyDescriptor>)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parse outbound in {}", path.display()))?;
    // 代理文件中可能混入 direct/block/selector 等非服务器出站
    Ok(proxies.into_iter().filter(ProxyDescriptor::is_server).collect())
}
