use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use statelessor_mcp::client::ApiClient;
use statelessor_mcp::config::load_config;
use statelessor_mcp::mcp::http::run_http_server;
use statelessor_mcp::mcp::{run_server, StatelessorServer};
use statelessor_mcp::observability::init_logging;

#[derive(Parser)]
#[command(
    name = "statelessor-mcp",
    version,
    about = "MCP server for the Statelessor stateful-pattern analysis service",
    long_about = "Statelessor MCP lets AI assistants scan .NET and Java projects for\n\
        stateful code patterns that block horizontal scaling.\n\n\
        Quick start:\n  \
        statelessor-mcp serve\n  \
        STATELESSOR_API_URL=https://statelessor.example.com statelessor-mcp serve\n  \
        statelessor-mcp ssh-key"
)]
struct Cli {
    /// Enable verbose logging (set log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a YAML config file (default: $STATELESSOR_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server (default)
    ///
    /// Speaks MCP over stdin/stdout unless --http is given.
    ///
    /// Examples:
    ///   statelessor-mcp serve
    ///   statelessor-mcp serve --http 127.0.0.1:8080
    Serve {
        /// Serve streamable HTTP on this address instead of stdio
        #[arg(long)]
        http: Option<String>,
    },
    /// Generate a deploy key for analyzing private repositories
    ///
    /// Prints the key id to pass as sshKeyId and the public key to add to
    /// the repository's deploy keys.
    SshKey,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command.unwrap_or(Commands::Serve { http: None }) {
        Commands::Serve { http } => {
            let server = StatelessorServer::from_config(config)?;
            match http {
                Some(addr) => run_http_server(server, &addr).await,
                None => run_server(server).await,
            }
        }
        Commands::SshKey => {
            let api = ApiClient::new(&config.api)?;
            let key = api.generate_ssh_key().await?;
            println!("Key ID: {}", key.key_id);
            println!();
            println!("{}", key.public_key);
            Ok(())
        }
    }
}
