use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vishkar_mcp::config::ConfigLoader;
use vishkar_mcp::services::{FileAgentMatcher, IntentAnalyzer, Services};
use vishkar_mcp::{api, mcp};

#[derive(Parser)]
#[command(name = "vishkar")]
#[command(about = "Engineering guidance and context bundles for AI coding assistants")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP JSON-RPC server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Start MCP server via stdio
    Mcp,
    /// Classify a task statement and print the result as JSON
    Analyze {
        /// The task statement
        statement: String,
    },
    /// Recommend agents for file paths and print the result as JSON
    Match {
        /// File paths to match
        paths: Vec<String>,
    },
}

/// Initialize tracing with output to stderr (for MCP mode) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "vishkar_mcp=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // stdout carries the protocol or the command's JSON output
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn build_services() -> anyhow::Result<Services> {
    tracing::info!(
        "Using config directory {}",
        ConfigLoader::global().dir().display()
    );
    Ok(Services::shared()?)
}

async fn serve(host: &str, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting Vishkar server on port {}", port);

    let app = api::create_router(build_services()?);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("Vishkar server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(use_stderr);

    match cli.command {
        Some(Commands::Serve { port, host }) => serve(&host, port).await?,
        Some(Commands::Mcp) => {
            mcp::run_stdio_server(build_services()?).await?;
        }
        Some(Commands::Analyze { statement }) => {
            let intent = IntentAnalyzer::new().analyze(&statement);
            println!("{}", serde_json::to_string_pretty(&intent)?);
        }
        Some(Commands::Match { paths }) => {
            let default_agent = ConfigLoader::global()
                .load()
                .map(|bundle| bundle.settings.default_agent.clone())
                .unwrap_or_else(|e| {
                    tracing::warn!("Using built-in default agent: {}", e);
                    vishkar_mcp::services::DEFAULT_AGENT.to_string()
                });
            match FileAgentMatcher::new(default_agent).recommend(&paths) {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(usage) => {
                    println!("{}", serde_json::to_string_pretty(&usage)?);
                    std::process::exit(2);
                }
            }
        }
        None => serve("127.0.0.1", 3000).await?,
    }

    Ok(())
}
