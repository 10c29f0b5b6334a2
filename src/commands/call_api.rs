use crate::config::NegotiatorConfig;
use crate::peer::media::SyntheticDevices;
use crate::session::Session;
use crate::signaling::{HttpEndpoint, NegotiationEndpoint, StdinEndpoint};
use crate::view::ConsoleView;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

pub struct CallOptions {
    pub config: NegotiatorConfig,
    /// answer вставляется вручную вместо POST
    pub manual: bool,
    pub display: bool,
    pub deny_camera: bool,
}

/// Полный цикл стороны, создающей offer. Держит соединение до Ctrl-C.
pub async fn run_call(opts: CallOptions) -> anyhow::Result<()> {
    let view = Arc::new(ConsoleView::new());

    let mut devices = SyntheticDevices::new();
    if opts.deny_camera {
        devices = devices.deny_user();
    }

    let endpoint: Arc<dyn NegotiationEndpoint> = if opts.manual {
        Arc::new(StdinEndpoint)
    } else {
        Arc::new(HttpEndpoint::new(opts.config.endpoint.clone()))
    };

    let session = Session::new(opts.config, view, Arc::new(devices), endpoint)
        .await
        .context("failed to create peer connection")?;

    // Ctrl-C прерывает любой зависший шаг
    let cancel = session.cancellation_token();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        on_signal.cancel();
    });

    // сбои захвата уже показаны в области логов, продолжаем
    let _ = session.acquire_local_media().await;
    if opts.display {
        let _ = session.add_display_capture().await;
    }

    let offer = session
        .local_offer()
        .await
        .context("local offer never became available")?;
    info!(len = offer.len(), "offer available, starting session");

    session
        .start_session()
        .await
        .context("negotiation failed")?;

    info!("session negotiated, press Ctrl-C to hang up");
    cancel.cancelled().await;
    session.close().await?;
    Ok(())
}
