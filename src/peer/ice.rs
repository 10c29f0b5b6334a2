use crate::error::{NegotiatorError, Result};
use crate::peer::codec::{self, Encoding};
use crate::peer::types::ServerConfig;
use crate::utils::add_ice_url_scheme;
use crate::view::SessionView;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::RTCPeerConnection;

/// Преобразование настроек серверов в конфигурацию webrtc
pub fn ice_servers(servers: &[ServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|config| RTCIceServer {
            urls: vec![add_ice_url_scheme(config)],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        })
        .collect()
}

/// Проверка серверов перед созданием соединения
pub fn validate_servers(servers: &[ServerConfig]) -> Result<()> {
    for server in servers {
        if server.url.is_empty() {
            return Err(NegotiatorError::InvalidServer(
                "server URL cannot be empty".into(),
            ));
        }

        if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none()) {
            return Err(NegotiatorError::InvalidServer(format!(
                "TURN server {} requires username and credential",
                server.url
            )));
        }
    }
    Ok(())
}

/// Количество кандидатов по типам в собранном описании
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSummary {
    pub host: usize,
    pub srflx: usize,
    pub relay: usize,
    pub other: usize,
}

impl fmt::Display for CandidateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} host, {} srflx, {} relay",
            self.host, self.srflx, self.relay
        )
    }
}

pub fn candidate_summary(sdp: &str) -> CandidateSummary {
    let mut summary = CandidateSummary::default();
    for line in sdp.lines().filter(|l| l.starts_with("a=candidate:")) {
        if line.contains(" typ host") {
            summary.host += 1;
        } else if line.contains(" typ srflx") || line.contains(" typ prflx") {
            summary.srflx += 1;
        } else if line.contains(" typ relay") {
            summary.relay += 1;
        } else {
            summary.other += 1;
        }
    }
    summary
}

/// Выкладывает локальное описание в поле вида, как только сбор кандидатов завершён
pub struct LocalOfferPublisher {
    view: Arc<dyn SessionView>,
    encoding: Encoding,
    gathered: AtomicBool,
    tx: watch::Sender<Option<String>>,
}

impl LocalOfferPublisher {
    pub fn new(
        view: Arc<dyn SessionView>,
        encoding: Encoding,
    ) -> (Arc<Self>, watch::Receiver<Option<String>>) {
        let (tx, rx) = watch::channel(None);
        let publisher = Arc::new(Self {
            view,
            encoding,
            gathered: AtomicBool::new(false),
            tx,
        });
        (publisher, rx)
    }

    pub fn mark_gathered(&self) {
        self.gathered.store(true, Ordering::SeqCst);
    }

    pub fn is_gathered(&self) -> bool {
        self.gathered.load(Ordering::SeqCst)
    }

    pub async fn publish(&self, pc: &RTCPeerConnection) -> Result<String> {
        let desc = pc
            .local_description()
            .await
            .ok_or(NegotiatorError::NoLocalDescription)?;
        let encoded = codec::encode(&desc, self.encoding)?;

        let summary = candidate_summary(&desc.sdp);
        info!(
            fingerprint = %codec::fingerprint(&encoded),
            len = encoded.len(),
            "local {} ready ({summary})",
            desc.sdp_type
        );
        if summary.srflx == 0 && summary.relay == 0 {
            warn!("no srflx/relay candidates gathered, peers behind NAT may not connect");
        }

        self.view.set_local_session_description(&encoded);
        self.tx.send_replace(Some(encoded.clone()));
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(kind: &str, url: &str, creds: bool) -> ServerConfig {
        ServerConfig {
            id: "t".into(),
            r#type: kind.into(),
            url: url.into(),
            username: creds.then(|| "user".to_string()),
            credential: creds.then(|| "pass".to_string()),
        }
    }

    #[test]
    fn turn_requires_credentials() {
        assert!(validate_servers(&[server("turn", "turn:host", false)]).is_err());
        assert!(validate_servers(&[server("turn", "turn:host", true)]).is_ok());
        assert!(validate_servers(&[server("stun", "", false)]).is_err());
        assert!(validate_servers(&[]).is_ok());
    }

    #[test]
    fn maps_servers_with_scheme() {
        let mapped = ice_servers(&[server("turn", "host:3478", true)]);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].urls, vec!["turn:host:3478".to_string()]);
        assert_eq!(mapped[0].username, "user");
        assert_eq!(mapped[0].credential, "pass");
    }

    #[test]
    fn counts_candidate_types() {
        let sdp = "v=0\r\n\
a=candidate:1 1 udp 2130706431 10.0.0.2 50000 typ host\r\n\
a=candidate:2 1 udp 1694498815 203.0.113.7 50000 typ srflx raddr 10.0.0.2 rport 50000\r\n\
a=candidate:3 1 udp 16777215 198.51.100.1 3478 typ relay raddr 0.0.0.0 rport 0\r\n\
a=candidate:4 1 udp 2130706431 10.0.0.3 50001 typ host\r\n\
a=end-of-candidates\r\n";
        let summary = candidate_summary(sdp);
        assert_eq!(
            summary,
            CandidateSummary {
                host: 2,
                srflx: 1,
                relay: 1,
                other: 0
            }
        );
        assert_eq!(summary.to_string(), "2 host, 1 srflx, 1 relay");
    }
}
