use crate::error::Result;
use crate::logger::{dump_candidate, dump_selected_pair};
use crate::peer::ice::{ice_servers, validate_servers, LocalOfferPublisher};
use crate::peer::types::ServerConfig;
use crate::view::SessionView;
use std::sync::Arc;
use tracing::{debug, info};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::RTCPeerConnection;

/// API с кодеками по умолчанию и стандартными интерсепторами (NACK, RTCP reports)
pub fn build_api() -> Result<API> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;

    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)?;

    Ok(APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build())
}

/// Создает конфигурацию для peer connection
pub fn rtc_config(servers: &[ServerConfig]) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: ice_servers(servers),
        ..Default::default()
    }
}

/// создаём Peer без обработчиков
pub async fn new_peer(servers: &[ServerConfig]) -> Result<Arc<RTCPeerConnection>> {
    validate_servers(servers)?;
    let api = build_api()?;
    let pc = api.new_peer_connection(rtc_config(servers)).await?;
    Ok(Arc::new(pc))
}

/// Обработчики стороны, создающей offer.
///
/// Промежуточные кандидаты только пишутся в debug-лог; `None` означает конец сбора,
/// после чего текущее локальное описание выкладывается в поле вида.
pub fn install_offerer_handlers(
    pc: &Arc<RTCPeerConnection>,
    view: Arc<dyn SessionView>,
    publisher: Arc<LocalOfferPublisher>,
) {
    let weak = Arc::downgrade(pc);
    let gather_view = Arc::clone(&view);
    pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
        match cand {
            Some(c) => dump_candidate("LOCAL", &c),
            None => {
                debug!("ICE candidate gathering completed (null candidate received)");
                publisher.mark_gathered();

                let weak = weak.clone();
                let publisher = Arc::clone(&publisher);
                let view = Arc::clone(&gather_view);
                tokio::spawn(async move {
                    let Some(pc) = weak.upgrade() else {
                        return;
                    };
                    if let Err(e) = publisher.publish(&pc).await {
                        view.append_log(&e.to_string());
                    }
                });
            }
        }
        Box::pin(async {})
    }));

    let weak = Arc::downgrade(pc);
    pc.on_ice_connection_state_change(Box::new(move |st: RTCIceConnectionState| {
        // в область логов как есть
        view.append_log(&st.to_string());
        info!("ICE connection state changed to: {st}");

        if matches!(
            st,
            RTCIceConnectionState::Connected | RTCIceConnectionState::Failed
        ) {
            if let Some(pc) = weak.upgrade() {
                let moment = if st == RTCIceConnectionState::Connected {
                    "CONNECTED"
                } else {
                    "FAILED"
                };
                tokio::spawn(async move {
                    dump_selected_pair(&pc, moment).await;
                });
            }
        }
        Box::pin(async {})
    }));

    pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
        debug!("Peer connection state changed to: {st:?}");
        Box::pin(async {})
    }));
}
