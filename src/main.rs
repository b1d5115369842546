//! Relay server for a replicated rich-text document.
//!
//! Hosts one document over HTTP and WebSocket using the Axum web framework.
//! Configure with `RICHTEXT_BIND`, `RICHTEXT_DOCUMENT`, `RICHTEXT_AUTHOR`,
//! `RICHTEXT_STATE_DIR` and `RUST_LOG`.

use crdt_richtext::{Document, JsonDirectorySource, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod server;

use server::{Relay, create_router};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    info!(
        "Serving document '{}' as author '{}'",
        config.document.document_id, config.document.author_id
    );

    let mut document = Document::new(config.document.clone());
    if let Some(dir) = &config.state_dir {
        info!("Bootstrapping from {}", dir.display());
        document = document.with_source(JsonDirectorySource::new(dir));
    }

    let app = create_router(Relay::new(document));

    info!("Server listening on http://{}", config.bind_addr);
    info!("Available endpoints:");
    info!("  GET  /health        - Health check");
    info!("  GET  /doc           - Projected document tree");
    info!("  POST /transactions  - Apply an editor transaction");
    info!("  GET  /state         - Encoded document state");
    info!("  POST /updates       - Apply a remote update");
    info!("  GET  /ws            - Update relay socket");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await
}
