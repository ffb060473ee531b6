// Keep-alive health endpoint
//
// Some hosts hibernate processes without inbound HTTP traffic, so the bot
// exposes a single status page. Not part of the bot's logical core.

use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tracing::{error, info, warn};

const STATUS_PAGE: &str = r#"<html>
    <head><title>Discord Ticket Bot - Status</title></head>
    <body style="font-family: Arial, sans-serif; background: #0d1117; color: #c9d1d9; text-align: center;">
        <h1>🤖 Discord Ticket Bot</h1>
        <div style="color: #3fb950; font-size: 24px; font-weight: bold;">✅ I'm alive!</div>
    </body>
</html>"#;

async fn status() -> Html<&'static str> {
    Html(STATUS_PAGE)
}

/// Serve the status page on `port`, falling back to `port + 1` when the
/// first bind fails (typically an address-in-use from a stale instance).
pub async fn run(port: u16) {
    let app = Router::new().route("/", get(status));

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!("Port {} unavailable ({}), trying {}", port, e, port + 1);
            match tokio::net::TcpListener::bind(("0.0.0.0", port + 1)).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!("Failed to bind health server: {}", e);
                    return;
                }
            }
        }
    };

    match listener.local_addr() {
        Ok(addr) => info!("Health server listening on {}", addr),
        Err(_) => info!("Health server listening"),
    }

    if let Err(e) = axum::serve(listener, app).await {
        error!("Health server error: {}", e);
    }
}
