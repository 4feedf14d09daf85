use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use textscan_server::config::Config;
use textscan_server::recognition::ScriptCode;
use textscan_server::server;

#[derive(Parser, Debug)]
#[command(name = "textscan-server")]
#[command(about = "OCR preprocessing server for photographed text pages")]
#[command(version)]
struct Args {
    /// Host address to bind to
    #[arg(long, env = "TEXTSCAN_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "TEXTSCAN_PORT", default_value = "9310")]
    port: u16,

    /// Default script selector forwarded to the recognition engine
    /// (tha+eng, eng, chi_sim, chi_tra, tha+chi_sim)
    #[arg(long, env = "TEXTSCAN_DEFAULT_SCRIPT", default_value = "tha+eng")]
    default_script: String,

    /// Default engine configuration string, passed through to the engine unchanged
    #[arg(long, env = "TEXTSCAN_ENGINE_CONFIG", default_value = "--oem 3 --psm 3")]
    engine_config: String,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "TEXTSCAN_MAX_FILE_SIZE", default_value = "52428800")]
    max_file_size: usize,

    /// Path to the traineddata directory (downloaded on demand if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    tessdata_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let default_script = ScriptCode::from_str(&args.default_script)
        .ok_or_else(|| anyhow::anyhow!("unknown script selector: {}", args.default_script))?;

    let config = Config {
        host: args.host,
        port: args.port,
        default_script,
        engine_config: args.engine_config,
        max_file_size: args.max_file_size,
        tessdata_path: args.tessdata_path,
    };

    tracing::info!("Starting textscan-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
