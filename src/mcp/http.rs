//! HTTP transport for the MCP server using rmcp's StreamableHttpService.
//!
//! Lets remote MCP clients reach Statelessor over HTTP instead of stdio.
//!
//! Usage: `statelessor-mcp serve --http 127.0.0.1:8080`

use super::server::{shutdown_signal, StatelessorServer};

/// Start the MCP server over HTTP on the given address.
///
/// The server exposes a single `/mcp` endpoint that handles the MCP
/// streamable HTTP protocol (POST for requests, SSE for server-initiated
/// messages). Each client gets its own session sharing one API client.
pub async fn run_http_server(
    server: StatelessorServer,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Statelessor MCP server listening on http://{}/mcp", listener.local_addr()?);

    axum::serve(listener, router(server))
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutting down HTTP server");
        })
        .await?;

    Ok(())
}

/// Router with the MCP service nested at `/mcp`.
pub fn router(server: StatelessorServer) -> axum::Router {
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpService,
    };

    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    axum::Router::new().nest_service("/mcp", service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatelessorConfig;

    #[test]
    fn server_can_be_cloned_for_http_factory() {
        // StreamableHttpService requires a Clone factory.
        let server = StatelessorServer::from_config(StatelessorConfig::default()).unwrap();
        let _router = router(server.clone());
        let _cloned = server.clone();
    }
}
