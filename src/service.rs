use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use std::net::SocketAddr;

/// Serve the searcher healthcheck on the given socket address.
pub fn serve_searcher(socket: impl Into<SocketAddr>) -> tokio::task::JoinHandle<()> {
    let router = Router::new()
        .route("/healthcheck", get(|| async { (StatusCode::OK, "ok").into_response() }))
        .fallback(|| async { (StatusCode::NOT_FOUND, "not found").into_response() });

    let addr = socket.into();
    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, router).await {
                    tracing::error!(%err, "serve failed");
                }
            }
            Err(err) => {
                tracing::error!(%err, "failed to bind to the address");
            }
        };
    })
}
