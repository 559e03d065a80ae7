use std::path::PathBuf;

use cadpick_config::{AppConfig, ConfigError};
use cadpick_frontend::loader::resolve_dxf_path;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 在控制台中对图纸执行选择类命令。
#[derive(Debug, Parser)]
#[command(name = "cadpick", version, about)]
struct Args {
    /// 配置文件路径，缺省时按 CADPICK_CONFIG 与 ./config/default.toml 查找
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// 要打开的 DXF 文件，优先于配置文件中的 document.dxf_path
    #[arg(long, value_name = "PATH")]
    dxf: Option<PathBuf>,
    /// 只执行一条命令后退出
    #[arg(long, value_name = "NAME")]
    command: Option<String>,
}

fn main() {
    let args = Args::parse();

    let (config, config_error) = load_configuration(args.config);
    init_logging(&config);
    if let Some(err) = &config_error {
        report_config_error(err);
    }
    info!("启动 cadpick 控制台");

    let dxf_path = resolve_dxf_path(args.dxf.as_deref(), &config);
    if let Err(err) = cadpick_frontend::run_console(dxf_path.as_deref(), args.command.as_deref()) {
        error!(error = %err, "控制台会话失败");
        std::process::exit(1);
    }
}

/// 加载配置；失败时返回默认配置以及原因，待日志初始化后再汇报。
fn load_configuration(override_path: Option<PathBuf>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(cfg) => (cfg, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

fn report_config_error(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载配置失败，使用内建默认值");
        }
        ConfigError::Context { .. } => {
            warn!(error = %err, "加载配置失败，使用内建默认值");
        }
    }
}

/// 日志写到 stderr，stdout 只留给命令输出。
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
