use anyhow::Context;
use clap::{Parser, ValueEnum};
use mimic_http::server;
use mimic_http::ServerConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "mimic", version, about = "HTTP service virtualization server")]
struct Args {
    /// Port to listen on, overriding the config file
    #[arg(short, long, env = "MIMIC_PORT")]
    port: Option<u16>,

    /// YAML or JSON config file with listener settings and mappings
    #[arg(short, long, env = "MIMIC_CONFIG")]
    config: Option<String>,

    /// Answer with the best partial match when nothing matches perfectly
    #[arg(long, env = "MIMIC_ALLOW_PARTIAL_MAPPING")]
    allow_partial_mapping: bool,

    #[arg(long, value_enum, default_value = "text", env = "MIMIC_LOG_FORMAT")]
    log_format: LogFormat,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(args: &Args) {
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if args.allow_partial_mapping {
        config.allow_partial_mapping = true;
    }

    let addr = config.listen.socket_addr()?;
    let matcher = server::build_matcher(&config).context("Failed to compile mappings")?;
    let running = server::serve(addr, matcher)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    running.shutdown().await;
    Ok(())
}
