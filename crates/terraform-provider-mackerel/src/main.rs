// # terraform-provider-mackerel - Provider Server
//
// This binary is a THIN integration layer: all reconciliation logic lives
// in mackerel-provider-core.
//
// The binary is responsible for:
// 1. Reading server options from environment variables (once)
// 2. Initializing logging
// 3. Building the provider server (legacy only, or multiplexed)
// 4. Serving JSON requests on stdin, one response line per request on stdout
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Credentials
// - `MACKEREL_APIKEY` / `MACKEREL_API_KEY`: API key
// - `API_BASE`: API endpoint (default https://api.mackerelio.com/)
//
// ### Engine Generations
// - `MACKEREL_EXPERIMENTAL_TFFRAMEWORK`: `1` or `true` enables the current generation
// - `MACKEREL_TFFRAMEWORK_RESOURCES`: Comma-separated resource types it serves
// - `MACKEREL_TFFRAMEWORK_DATA_SOURCES`: Comma-separated data source types it serves
// - `MACKEREL_DISABLED_RESOURCES` / `MACKEREL_DISABLED_DATA_SOURCES`: Types removed entirely
//
// ### Logging
// - `MACKEREL_LOG_LEVEL`: trace, debug, info, warn, error (logs go to stderr)
//
// ## Example
//
// ```bash
// export MACKEREL_APIKEY=your_key
// export MACKEREL_EXPERIMENTAL_TFFRAMEWORK=1
//
// echo '{"method":"get_schema"}' | terraform-provider-mackerel
// ```

use anyhow::Result;
use mackerel_provider_core::error::Diagnostic;
use mackerel_provider_core::rpc::{self, Request, Response};
use mackerel_provider_core::traits::{ClientFactory, ProviderServer};
use mackerel_provider_core::{ServerOptions, build_server};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ProviderExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ProviderExitCode> for ExitCode {
    fn from(code: ProviderExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load options from environment
    let options = ServerOptions::from_env();

    if let Err(e) = options.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ProviderExitCode::ConfigError.into();
    }

    let log_level = match options.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries protocol responses, so logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ProviderExitCode::ConfigError.into();
    }

    info!("Starting terraform-provider-mackerel");
    debug!("Server options: {:?}", options);

    let server = match build_server(&options, client_factory()) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to build provider server: {}", e);
            return ProviderExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ProviderExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = serve(server).await {
            error!("Provider server error: {}", e);
            ProviderExitCode::RuntimeError
        } else {
            ProviderExitCode::CleanShutdown
        }
    });

    result.into()
}

#[cfg(feature = "http")]
fn client_factory() -> Arc<dyn ClientFactory> {
    Arc::new(mackerel_client_http::HttpClientFactory)
}

// Without the HTTP client the server runs against an in-memory remote
#[cfg(not(feature = "http"))]
fn client_factory() -> Arc<dyn ClientFactory> {
    tracing::warn!("Built without the http feature, using an in-memory Mackerel remote");
    Arc::new(mackerel_provider_core::MemoryClient::new())
}

/// Serve requests until stdin closes or a shutdown signal arrives
async fn serve(server: Arc<dyn ProviderServer>) -> Result<()> {
    let mut requests = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut stdout = tokio::io::stdout();

    info!(
        "Serving {} resource and {} data source types",
        server.resource_types().len(),
        server.data_source_types().len()
    );

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            signal = &mut shutdown => {
                info!("Received shutdown signal: {}", signal?);
                break;
            }
            line = requests.next() => match line {
                Some(line) => line?,
                None => {
                    info!("Request stream closed, shutting down");
                    break;
                }
            },
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(server.as_ref(), &line).await;
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

async fn handle_line(server: &dyn ProviderServer, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => rpc::dispatch(server, request).await,
        Err(e) => Response {
            result: None,
            diagnostics: vec![Diagnostic::error("Invalid Request", e.to_string())],
        },
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
