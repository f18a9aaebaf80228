// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! apd daemon.
//!
//! Serves the control surface as newline-delimited JSON: one
//! `ControlRequest` per line on stdin, one `ControlResponse` per line on
//! stdout. Logs go to stderr. On EOF, SIGINT or SIGTERM every claimed
//! interface is torn down before exit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use apd_core::{ApService, ApdConfig, ControlClient, ControlRequest, ControlResponse, ControlServer};
use apd_platform::{SYSFS_NET, SysfsInterfaceTool, discover_ap_interfaces};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = load_config(config_path(&args)?.as_deref())?;
    let config = with_discovered_candidates(config).await;

    let control = Arc::new(SysfsInterfaceTool::new());
    let service = Arc::new(ApService::new(&config, control).context("invalid configuration")?);
    let (server, client) = ControlServer::new(Arc::clone(&service));
    let server_task = tokio::spawn(server.run());

    tracing::info!(
        candidates = ?config.interfaces.candidates,
        max_sessions = config.interfaces.max_sessions,
        "apd ready"
    );

    let (outcome, signalled) = tokio::select! {
        result = serve_stdio(client) => (result, false),
        () = shutdown_signal() => (Ok(()), true),
    };

    // The client is gone; the server finishes its current request and exits.
    if let Err(e) = server_task.await {
        tracing::warn!(error = %e, "control server task failed");
    }

    service.tear_down_interfaces().await;
    tracing::info!("apd stopped");

    if signalled {
        // A pending stdin read holds a blocking thread the runtime would
        // wait on forever.
        std::process::exit(0);
    }
    outcome
}

fn config_path(args: &[String]) -> anyhow::Result<Option<PathBuf>> {
    let Some(pos) = args.iter().position(|a| a == "--config" || a == "-c") else {
        return Ok(None);
    };
    match args.get(pos + 1) {
        Some(path) => Ok(Some(PathBuf::from(path))),
        None => bail!("--config requires a path"),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ApdConfig> {
    match path {
        Some(path) => ApdConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => {
            tracing::info!("no --config given, using defaults");
            Ok(ApdConfig::default())
        }
    }
}

async fn with_discovered_candidates(mut config: ApdConfig) -> ApdConfig {
    if !config.interfaces.candidates.is_empty() {
        return config;
    }
    match discover_ap_interfaces(Path::new(SYSFS_NET)).await {
        Ok(found) => {
            if found.is_empty() {
                tracing::warn!("no wireless interfaces found, every create will return none");
            }
            config.interfaces.candidates = found;
        }
        Err(e) => tracing::warn!(error = %e, "interface discovery failed"),
    }
    config
}

async fn serve_stdio(client: ControlClient) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ControlRequest>(&line) {
            Ok(request) => client.call(request).await.context("control server stopped")?,
            Err(e) => ControlResponse::Error {
                message: format!("invalid request: {e}"),
            },
        };

        let mut out = serde_json::to_string(&response).context("encoding response")?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await.context("writing stdout")?;
        stdout.flush().await.context("writing stdout")?;
    }

    tracing::info!("stdin closed");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::warn!(error = %e, "cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
        _ = term.recv() => tracing::info!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received ctrl-c");
}

fn print_help() {
    println!("apd - software access point daemon");
    println!();
    println!("USAGE:");
    println!("    apd [--config <path>]");
    println!();
    println!("Reads one JSON control request per line on stdin and writes one");
    println!("JSON response per line on stdout. Example:");
    println!();
    println!(r#"    {{"op":"create_ap_interface"}}"#);
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <path>  TOML configuration file");
    println!("    -h, --help           Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG             Log filter (default: info)");
}
