use crate::config::AnswererConfig;
use crate::peer::answerer::Answerer;
use crate::peer::types::{CallRequest, CallResponse, ErrorResponse};
use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// `POST /call`; прочие методы получают 405 от роутера
pub fn router(answerer: Arc<Answerer>) -> Router {
    Router::new()
        .route("/call", post(call))
        .with_state(answerer)
}

// тело читается как есть: браузер шлёт JSON без content-type
async fn call(State(answerer): State<Arc<Answerer>>, body: Bytes) -> Response {
    let req: CallRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!("Failed to decode request: {e}");
            return error_response(format!("failed to decode request: {e}"));
        }
    };

    match answerer.answer(&req.offer).await {
        Ok(answer) => Json(CallResponse { answer }).into_response(),
        Err(e) => {
            warn!("Failed to answer offer: {e}");
            error_response(e.to_string())
        }
    }
}

fn error_response(msg: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(msg)),
    )
        .into_response()
}

pub async fn serve(config: AnswererConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    serve_on(listener, Arc::new(Answerer::new(config)), shutdown).await
}

pub async fn serve_on(
    listener: TcpListener,
    answerer: Arc<Answerer>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    info!("Listen on {}", listener.local_addr()?);
    axum::serve(listener, router(Arc::clone(&answerer)))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    answerer.close_all().await;
    info!("answering endpoint stopped");
    Ok(())
}
