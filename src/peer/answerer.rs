use crate::config::AnswererConfig;
use crate::error::{NegotiatorError, Result};
use crate::peer::codec;
use crate::peer::connection::new_peer;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// Отвечающая сторона: принимает offer, возвращает answer после полного сбора кандидатов
pub struct Answerer {
    config: AnswererConfig,
    peers: Mutex<Vec<Arc<RTCPeerConnection>>>,
}

impl Answerer {
    pub fn new(config: AnswererConfig) -> Self {
        Self {
            config,
            peers: Mutex::new(Vec::new()),
        }
    }

    pub async fn answer(&self, encoded_offer: &str) -> Result<String> {
        info!(
            fingerprint = %codec::fingerprint(encoded_offer),
            len = encoded_offer.len(),
            "offer received"
        );
        let offer = codec::decode(encoded_offer)?;

        let pc = new_peer(&self.config.ice_servers).await?;
        install_answerer_handlers(&pc, self.config.pli_interval);

        match self.negotiate(&pc, offer).await {
            Ok(answer) => {
                self.keep(pc);
                Ok(answer)
            }
            Err(e) => {
                let _ = pc.close().await;
                Err(e)
            }
        }
    }

    async fn negotiate(
        &self,
        pc: &RTCPeerConnection,
        offer: RTCSessionDescription,
    ) -> Result<String> {
        pc.set_remote_description(offer).await?;
        let answer = pc.create_answer(None).await?;

        // канал закрывается по завершении сбора кандидатов, trickle не используется
        let mut gather_complete = pc.gathering_complete_promise().await;
        pc.set_local_description(answer).await?;

        let after = self.config.gathering_timeout;
        timeout(after, gather_complete.recv())
            .await
            .map_err(|_| NegotiatorError::Timeout {
                step: "ICE gathering",
                after,
            })?;

        let desc = pc
            .local_description()
            .await
            .ok_or(NegotiatorError::NoLocalDescription)?;
        let encoded = codec::encode(&desc, self.config.encoding)?;
        info!(
            fingerprint = %codec::fingerprint(&encoded),
            len = encoded.len(),
            "answer ready"
        );
        Ok(encoded)
    }

    fn keep(&self, pc: Arc<RTCPeerConnection>) {
        if let Ok(mut peers) = self.peers.lock() {
            peers.retain(|p| is_alive(p));
            peers.push(pc);
        }
    }

    /// Число живых соединений
    pub fn active_peers(&self) -> usize {
        self.peers
            .lock()
            .map(|mut peers| {
                peers.retain(|p| is_alive(p));
                peers.len()
            })
            .unwrap_or(0)
    }

    pub async fn close_all(&self) {
        let peers = match self.peers.lock() {
            Ok(mut peers) => std::mem::take(&mut *peers),
            Err(_) => return,
        };
        for pc in peers {
            let _ = pc.close().await;
        }
    }
}

fn is_alive(pc: &RTCPeerConnection) -> bool {
    !matches!(
        pc.connection_state(),
        RTCPeerConnectionState::Closed | RTCPeerConnectionState::Failed
    )
}

fn install_answerer_handlers(pc: &Arc<RTCPeerConnection>, pli_interval: Duration) {
    let weak = Arc::downgrade(pc);
    pc.on_track(Box::new(
        move |track: Arc<TrackRemote>,
              _receiver: Arc<RTCRtpReceiver>,
              _transceiver: Arc<RTCRtpTransceiver>| {
            let codec = track.codec();
            info!(
                "Track has started, of type {}: {}",
                track.payload_type(),
                codec.capability.mime_type
            );

            if track.kind() == RTPCodecType::Video {
                tokio::spawn(send_pli(weak.clone(), track.ssrc(), pli_interval));
            }
            tokio::spawn(drain_track(track));
            Box::pin(async {})
        },
    ));

    pc.on_ice_connection_state_change(Box::new(move |st: RTCIceConnectionState| {
        info!("Connection State has changed {st}");
        Box::pin(async {})
    }));

    let weak = Arc::downgrade(pc);
    pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
        debug!("answerer peer connection state: {st:?}");
        if st == RTCPeerConnectionState::Failed {
            if let Some(pc) = weak.upgrade() {
                tokio::spawn(async move {
                    let _ = pc.close().await;
                });
            }
        }
        Box::pin(async {})
    }));
}

/// Периодический PLI, чтобы отправитель присылал ключевые кадры
async fn send_pli(pc: Weak<RTCPeerConnection>, media_ssrc: u32, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let Some(pc) = pc.upgrade() else {
            return;
        };
        if pc.connection_state() == RTCPeerConnectionState::Closed {
            return;
        }
        if let Err(e) = pc
            .write_rtcp(&[Box::new(PictureLossIndication {
                sender_ssrc: 0,
                media_ssrc,
            })])
            .await
        {
            warn!("PLI send failed: {e}");
        }
    }
}

/// Вычитывает RTP; медиа не декодируется
async fn drain_track(track: Arc<TrackRemote>) {
    let mut packets = 0u64;
    let mut bytes = 0usize;
    while let Ok((pkt, _)) = track.read_rtp().await {
        packets += 1;
        bytes += pkt.payload.len();
        if packets % 1000 == 0 {
            debug!(ssrc = track.ssrc(), packets, bytes, "receiving");
        }
    }
    info!(ssrc = track.ssrc(), packets, bytes, "track ended");
}
