//! Согласование одной сессии: захват медиа, offer, ожидание конца сбора
//! кандидатов, обмен с удалённой стороной и применение answer.
//!
//! Все ошибки уходят пользователю через [`SessionView`]: сбои захвата и
//! создания offer пишутся в область логов, сбои обмена показываются через
//! `alert`. Повторов нет. Методы всё равно возвращают `Result`, чтобы
//! вызывающий код мог выстроить свой порядок шагов.

use crate::config::NegotiatorConfig;
use crate::error::{NegotiatorError, Result};
use crate::peer::codec;
use crate::peer::connection::{install_offerer_handlers, new_peer};
use crate::peer::ice::LocalOfferPublisher;
use crate::peer::media::{attach_stream, MediaConstraints, MediaDevices};
use crate::signaling::NegotiationEndpoint;
use crate::view::SessionView;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use webrtc::peer_connection::RTCPeerConnection;

#[derive(Default)]
struct SessionState {
    /// id треков, уже добавленных в соединение
    attached: HashSet<String>,
    offers_created: u64,
}

pub struct Session {
    pc: Arc<RTCPeerConnection>,
    view: Arc<dyn SessionView>,
    devices: Arc<dyn MediaDevices>,
    endpoint: Arc<dyn NegotiationEndpoint>,
    config: NegotiatorConfig,
    publisher: Arc<LocalOfferPublisher>,
    offer_rx: watch::Receiver<Option<String>>,
    // держится на всё время attach → offer, чтобы offer был не больше одного
    state: Mutex<SessionState>,
    cancel: CancellationToken,
}

impl Session {
    pub async fn new(
        config: NegotiatorConfig,
        view: Arc<dyn SessionView>,
        devices: Arc<dyn MediaDevices>,
        endpoint: Arc<dyn NegotiationEndpoint>,
    ) -> Result<Self> {
        let pc = new_peer(&config.ice_servers).await?;
        let (publisher, offer_rx) = LocalOfferPublisher::new(Arc::clone(&view), config.encoding);
        install_offerer_handlers(&pc, Arc::clone(&view), Arc::clone(&publisher));

        Ok(Self {
            pc,
            view,
            devices,
            endpoint,
            config,
            publisher,
            offer_rx,
            state: Mutex::new(SessionState::default()),
            cancel: CancellationToken::new(),
        })
    }

    pub fn connection(&self) -> &Arc<RTCPeerConnection> {
        &self.pc
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Камера + микрофон → треки в соединение → превью → offer
    pub async fn acquire_local_media(&self) -> Result<()> {
        self.acquire_local_media_inner()
            .await
            .inspect_err(|e| self.log_error(e))
    }

    async fn acquire_local_media_inner(&self) -> Result<()> {
        let stream = self
            .step(
                "getUserMedia",
                self.config.timeouts.media,
                self.devices.get_user_media(MediaConstraints::default()),
            )
            .await?;

        let mut state = self.state.lock().await;
        let added = attach_stream(&self.pc, &stream, &mut state.attached).await?;
        info!(stream = %stream.id, added, "local media attached");
        self.view.render_stream(&stream);
        self.commit_offer(&mut state).await
    }

    /// Захват экрана. После первого успеха кнопка выключена навсегда,
    /// повторный вызов возвращает [`NegotiatorError::DisplayCaptureActive`].
    /// При отказе ошибка пишется в лог, а кнопка остаётся включённой.
    pub async fn add_display_capture(&self) -> Result<()> {
        self.add_display_capture_inner()
            .await
            .inspect_err(|e| self.log_error(e))
    }

    async fn add_display_capture_inner(&self) -> Result<()> {
        if self.view.display_capture_disabled() {
            return Err(NegotiatorError::DisplayCaptureActive);
        }

        let stream = self
            .step(
                "getDisplayMedia",
                self.config.timeouts.media,
                self.devices.get_display_media(),
            )
            .await
            .map_err(|e| match e {
                NegotiatorError::MediaAcquisition(msg) => NegotiatorError::DisplayCapture(msg),
                other => other,
            })?;

        let mut state = self.state.lock().await;
        // два одновременных вызова: второй не должен добавить треки
        if self.view.display_capture_disabled() {
            return Err(NegotiatorError::DisplayCaptureActive);
        }
        self.view.disable_display_capture();
        self.view.render_stream(&stream);

        let added = attach_stream(&self.pc, &stream, &mut state.attached).await?;
        info!(stream = %stream.id, added, "display capture attached");
        self.commit_offer(&mut state).await
    }

    /// Создать offer и сразу сделать его локальным описанием
    pub async fn create_and_set_offer(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.commit_offer(&mut state)
            .await
            .inspect_err(|e| self.log_error(e))
    }

    async fn commit_offer(&self, state: &mut SessionState) -> Result<()> {
        let after = self.config.timeouts.offer;
        let offer = self
            .step("createOffer", after, async {
                self.pc.create_offer(None).await.map_err(NegotiatorError::from)
            })
            .await?;
        self.step("setLocalDescription", after, async {
            self.pc
                .set_local_description(offer)
                .await
                .map_err(NegotiatorError::from)
        })
        .await?;
        state.offers_created += 1;
        info!(n = state.offers_created, "local offer committed");

        // при повторном согласовании null-кандидата больше не будет
        if self.publisher.is_gathered() {
            self.publisher.publish(&self.pc).await?;
        }
        Ok(())
    }

    /// Закодированный offer, доступный только после завершения сбора кандидатов
    pub async fn local_offer(&self) -> Result<String> {
        let mut rx = self.offer_rx.clone();
        self.step("ICE gathering", self.config.timeouts.gathering, async move {
            match rx.wait_for(|v| v.is_some()).await {
                Ok(offer) => Ok((*offer).clone().unwrap_or_default()),
                Err(_) => Err(NegotiatorError::Cancelled("ICE gathering")),
            }
        })
        .await
    }

    /// Отправить offer из поля вида и применить полученный answer.
    /// Пустое поле не проверяется и уходит как есть.
    pub async fn start_session(&self) -> Result<()> {
        self.start_session_inner()
            .await
            .inspect_err(|e| self.alert_error(e))
    }

    async fn start_session_inner(&self) -> Result<()> {
        let offer = self.view.local_session_description();
        let answer = self
            .step(
                "offer exchange",
                self.config.timeouts.exchange,
                self.endpoint.exchange(&offer),
            )
            .await?;
        self.commit_answer(&answer).await
    }

    /// Применить answer, вставленный вручную
    pub async fn apply_answer(&self, encoded: &str) -> Result<()> {
        self.commit_answer(encoded)
            .await
            .inspect_err(|e| self.alert_error(e))
    }

    async fn commit_answer(&self, encoded: &str) -> Result<()> {
        let answer = codec::decode(encoded)?;
        let _state = self.state.lock().await;
        self.step("setRemoteDescription", self.config.timeouts.offer, async {
            self.pc
                .set_remote_description(answer)
                .await
                .map_err(NegotiatorError::from)
        })
        .await?;
        info!(fingerprint = %codec::fingerprint(encoded), "remote description applied");
        Ok(())
    }

    /// Сколько локальных offer'ов уже закоммичено
    pub async fn offers_created(&self) -> u64 {
        self.state.lock().await.offers_created
    }

    pub async fn has_remote_description(&self) -> bool {
        self.pc.remote_description().await.is_some()
    }

    /// Отменить текущие шаги и закрыть соединение
    pub async fn close(&self) -> Result<()> {
        self.cancel.cancel();
        self.pc.close().await?;
        Ok(())
    }

    async fn step<T, F>(&self, step: &'static str, after: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(NegotiatorError::Cancelled(step)),
            res = timeout(after, fut) => {
                res.map_err(|_| NegotiatorError::Timeout { step, after })?
            }
        }
    }

    fn log_error(&self, e: &NegotiatorError) {
        warn!("{e}");
        self.view.append_log(&e.to_string());
    }

    fn alert_error(&self, e: &NegotiatorError) {
        warn!("{e}");
        self.view.alert(&e.to_string());
    }
}
