use agent_knowledge_server::config::ServerConfig;
use agent_knowledge_server::server::McpServer;
use agent_knowledge_server::state::ServerState;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Logs go to stderr; stdout carries JSON-RPC only.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("agent_knowledge_server=info")),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let state = match ServerState::open(config) {
        Ok(s) => s,
        Err(e) => {
            error!("cannot open knowledge store: {e}");
            std::process::exit(1);
        }
    };
    info!(path = %state.store.path().display(), "agent knowledge server starting");

    let mut server = McpServer::new(state);
    let outcome = server.run().await;

    if let Err(e) = server.into_state().shutdown() {
        error!("failed to close knowledge store: {e}");
    }
    if let Err(e) = outcome {
        error!("fatal error: {e}");
        std::process::exit(1);
    }
    info!("agent knowledge server stopped");
}
