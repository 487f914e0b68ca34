use anyhow::Result;
use clap::{Parser, Subcommand};
use pagespeed_core::{strategy_or_default, Coordinator};
use pagespeed_local::{resolve_api_key, ClientSettings, PsiClient};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "stdio")]
mod mcp;

#[derive(Parser, Debug)]
#[command(name = "pagespeed-mcp")]
#[command(
    about = "Google PageSpeed Insights as MCP tools (stdio server + CLI)",
    long_about = None
)]
struct Cli {
    /// PageSpeed Insights API key. Falls back to GOOGLE_PSI_API_KEY, then ./.env.
    #[arg(long, global = true)]
    api_key: Option<String>,
    /// Debug logging on stderr (RUST_LOG overrides).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (for Cursor / Claude Desktop / MCP clients).
    #[cfg(feature = "stdio")]
    McpStdio,
    /// Analyze URLs once and print the JSON results to stdout.
    Analyze(AnalyzeCmd),
    /// Diagnose configuration (json; never prints the key).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct AnalyzeCmd {
    /// URL to analyze (repeatable).
    #[arg(required = true)]
    urls: Vec<String>,
    /// Strategy: mobile, desktop, or both.
    #[arg(long, default_value = pagespeed_core::STRATEGY_BOTH)]
    strategy: String,
    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// Logs go to stderr: stdout carries the MCP transport.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose {
        "pagespeed_mcp=debug,pagespeed_core=debug,pagespeed_local=debug"
    } else {
        "pagespeed_mcp=info,pagespeed_core=info,pagespeed_local=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("pagespeed-mcp/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

/// Missing credentials are fatal: nothing can be analyzed without a key.
fn build_coordinator(api_key: Option<&str>) -> Result<Coordinator> {
    let Some(key) = resolve_api_key(api_key) else {
        tracing::error!(
            hint = "set --api-key, the GOOGLE_PSI_API_KEY env var, or add it to a .env file",
            "no API key provided"
        );
        anyhow::bail!(
            "no API key provided: set --api-key, GOOGLE_PSI_API_KEY, or GOOGLE_PSI_API_KEY=... in ./.env"
        );
    };
    let client = PsiClient::from_env(http_client()?, key.value());
    tracing::info!(
        key_source = ?key.source(),
        endpoint = %client.settings().endpoint,
        timeout_ms = client.settings().timeout_ms,
        "PSI client configured"
    );
    Ok(Coordinator::new(Arc::new(client)))
}

async fn analyze(cli_key: Option<&str>, args: AnalyzeCmd) -> Result<()> {
    let coordinator = build_coordinator(cli_key)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; cancelling in-flight analyses");
            on_ctrl_c.cancel();
        }
    });

    let strategy = strategy_or_default(Some(&args.strategy));
    let results = coordinator.run(&args.urls, &strategy, &cancel).await;
    let failed = results.iter().filter(|r| r.is_error()).count();
    tracing::info!(results = results.len(), failed, "analysis finished");

    let out = if args.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{out}");
    Ok(())
}

fn doctor(cli_key: Option<&str>, args: DoctorCmd) {
    let key = resolve_api_key(cli_key);
    let settings = ClientSettings::from_env();
    let v = serde_json::json!({
        "kind": "doctor",
        "ok": key.is_some(),
        "name": "pagespeed-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "features": { "stdio": cfg!(feature = "stdio") },
        "configured": {
            "api_key": key.is_some(),
            "api_key_source": key.as_ref().map(|k| k.source()),
            "endpoint": settings.endpoint,
            "timeout_ms": settings.timeout_ms,
            "max_body_bytes": settings.max_body_bytes,
        },
    });
    match args.output.to_ascii_lowercase().as_str() {
        "text" => {
            let source = key
                .as_ref()
                .map(|k| format!("{:?}", k.source()).to_lowercase())
                .unwrap_or_else(|| "missing".to_string());
            println!("pagespeed-mcp {}", env!("CARGO_PKG_VERSION"));
            println!("api key:  {source}");
            println!("endpoint: {}", settings.endpoint);
            println!("timeout:  {}ms", settings.timeout_ms);
        }
        _ => println!("{v}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let api_key = cli.api_key.as_deref();

    match cli.command {
        #[cfg(feature = "stdio")]
        Commands::McpStdio => {
            let coordinator = build_coordinator(api_key)?;
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                transport = "stdio",
                "pagespeed-mcp starting"
            );
            mcp::serve_stdio(coordinator)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::Analyze(args) => analyze(api_key, args).await?,
        Commands::Doctor(args) => doctor(api_key, args),
        Commands::Version(args) => {
            let v = serde_json::json!({
                "kind": "version",
                "ok": true,
                "name": "pagespeed-mcp",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("pagespeed-mcp {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }
    Ok(())
}
