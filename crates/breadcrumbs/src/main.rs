//! `agent-breadcrumbs`: serves the `log_work` MCP tool over stdio.

use anyhow::Context;
use breadcrumbs::config::{
    BreadcrumbsConfig, ConfigOverrides, load_properties_file, resolve_path,
};
use breadcrumbs::protocol::LoggingMode;
use breadcrumbs::server::BreadcrumbsServer;
use breadcrumbs::sinks::{LogSink, build_sink};
use breadcrumbs::tools::{LogWorkTool, RecordSchema};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Command-line options for the breadcrumbs server.
#[derive(Parser, Debug)]
#[command(name = "agent-breadcrumbs", version)]
struct Cli {
    /// Path to a config.json5 file (defaults to ~/.agent-breadcrumbs/config.json5)
    #[arg(long, env = "AGENT_BREADCRUMBS_CONFIG")]
    config: Option<PathBuf>,
    /// JSON5 file with custom log_record properties
    #[arg(long)]
    properties_file: Option<PathBuf>,
    /// When agents are asked to log
    #[arg(long, env = "AGENT_BREADCRUMBS_LOGGING_MODE", value_enum)]
    logging_mode: Option<ModeArg>,
    /// JSONL log file, used only by the jsonl sink
    #[arg(long, env = "AGENT_BREADCRUMBS_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Completion,
    Time,
}

impl From<ModeArg> for LoggingMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Completion => LoggingMode::Completion,
            ModeArg::Time => LoggingMode::Time,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    breadcrumbs::init_logging();
    let cli = Cli::parse();

    let (server, sink) = match start(cli) {
        Ok(started) => started,
        Err(err) => {
            eprintln!("agent-breadcrumbs server failed to start: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = serve(server).await;
    if let Err(err) = sink.close().await {
        warn!("sink close failed (name={}, error={})", sink.name(), err);
    } else {
        info!("sink closed (name={})", sink.name());
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("{failure}");
            ExitCode::FAILURE
        }
    }
}

/// Why [`serve`] returned early.
#[derive(Debug)]
enum ServeFailure {
    /// The stdio transport never came up.
    Start(anyhow::Error),
    /// The running service ended with an error.
    Run(anyhow::Error),
}

impl fmt::Display for ServeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start(err) => write!(f, "agent-breadcrumbs server failed to start: {err:#}"),
            Self::Run(err) => write!(f, "agent-breadcrumbs server stopped with error: {err:#}"),
        }
    }
}

/// Load config, apply overrides and build the sink and server.
fn start(cli: Cli) -> anyhow::Result<(BreadcrumbsServer, Arc<dyn LogSink>)> {
    info!(
        "starting server (config_set={}, properties_file_set={}, log_file_set={})",
        cli.config.is_some(),
        cli.properties_file.is_some(),
        cli.log_file.is_some()
    );
    let mut config = match cli.config.as_ref() {
        Some(path) => {
            info!("loading config from path: {}", path.display());
            BreadcrumbsConfig::load_from_path(path).context("failed to load config")?
        }
        None => BreadcrumbsConfig::load_default().context("failed to load default config")?,
    };

    let schema = match cli.properties_file.as_ref() {
        Some(path) => Some(
            load_properties_file(path)
                .with_context(|| format!("failed to load properties file {}", path.display()))?,
        ),
        None => None,
    };
    let log_file = match cli.log_file.as_ref() {
        Some(path) => {
            let cwd = std::env::current_dir().context("failed to resolve current directory")?;
            Some(resolve_path(path, &cwd)?)
        }
        None => None,
    };
    config.apply_overrides(ConfigOverrides {
        logging_mode: cli.logging_mode.map(LoggingMode::from),
        log_file,
        schema,
    });

    let sink = build_sink(&config.sink).context("failed to build sink")?;
    let schema = RecordSchema::resolve(config.schema.clone())
        .context("failed to compile log_record schema")?;
    info!(
        "tool ready (logging_mode={}, schema_source={}, sink={})",
        config.logging_mode,
        schema.source(),
        sink.name()
    );
    let tool = LogWorkTool::new(sink.clone(), schema, config.logging_mode);
    Ok((BreadcrumbsServer::new(Arc::new(tool)), sink))
}

/// Serve over stdio until the peer disconnects or the process is interrupted.
async fn serve(server: BreadcrumbsServer) -> Result<(), ServeFailure> {
    let service = server
        .serve(stdio())
        .await
        .context("failed to start stdio transport")
        .map_err(ServeFailure::Start)?;
    info!("server listening on stdio");

    tokio::select! {
        reason = service.waiting() => {
            let reason = reason
                .context("server task failed")
                .map_err(ServeFailure::Run)?;
            info!("server stopped (reason={:?})", reason);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }
    Ok(())
}
