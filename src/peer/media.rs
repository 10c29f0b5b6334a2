use crate::error::{NegotiatorError, Result};
use crate::peer::types::CaptureSource;
use crate::utils::random_id;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

/// Что запрашивается у устройств захвата
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Поток захвата: набор локальных треков с общим stream id
#[derive(Clone)]
pub struct MediaStream {
    pub id: String,
    pub source: CaptureSource,
    pub tracks: Vec<Arc<TrackLocalStaticSample>>,
}

impl MediaStream {
    pub fn track_ids(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.id().to_owned()).collect()
    }

    pub fn has_video(&self) -> bool {
        self.tracks.iter().any(|t| t.kind() == RTPCodecType::Video)
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("tracks", &self.track_ids())
            .finish()
    }
}

/// Источник медиа (аналог `navigator.mediaDevices`)
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(&self, constraints: MediaConstraints) -> Result<MediaStream>;
    async fn get_display_media(&self) -> Result<MediaStream>;
}

/// Устройства без реального железа: выдают VP8/Opus треки без сэмплов.
/// Запись сэмплов в треки остаётся за вызывающей стороной.
#[derive(Debug, Clone)]
pub struct SyntheticDevices {
    allow_user: bool,
    allow_display: bool,
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self {
            allow_user: true,
            allow_display: true,
        }
    }
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Камера и микрофон отвечают отказом в доступе
    pub fn deny_user(mut self) -> Self {
        self.allow_user = false;
        self
    }

    /// Захват экрана отвечает отказом в доступе
    pub fn deny_display(mut self) -> Self {
        self.allow_display = false;
        self
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn get_user_media(&self, constraints: MediaConstraints) -> Result<MediaStream> {
        if !self.allow_user {
            return Err(NegotiatorError::MediaAcquisition(
                "NotAllowedError: permission denied".into(),
            ));
        }
        if !constraints.audio && !constraints.video {
            return Err(NegotiatorError::MediaAcquisition(
                "at least one of audio and video must be requested".into(),
            ));
        }

        let stream_id = random_id();
        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(video_track(format!("camera-{stream_id}"), &stream_id));
        }
        if constraints.audio {
            tracks.push(audio_track(format!("microphone-{stream_id}"), &stream_id));
        }

        Ok(MediaStream {
            id: stream_id,
            source: CaptureSource::User,
            tracks,
        })
    }

    async fn get_display_media(&self) -> Result<MediaStream> {
        if !self.allow_display {
            return Err(NegotiatorError::DisplayCapture(
                "NotAllowedError: permission denied".into(),
            ));
        }

        let stream_id = random_id();
        Ok(MediaStream {
            tracks: vec![video_track(format!("screen-{stream_id}"), &stream_id)],
            id: stream_id,
            source: CaptureSource::Display,
        })
    }
}

fn video_track(id: String, stream_id: &str) -> Arc<TrackLocalStaticSample> {
    Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
        id,
        stream_id.to_owned(),
    ))
}

fn audio_track(id: String, stream_id: &str) -> Arc<TrackLocalStaticSample> {
    Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        id,
        stream_id.to_owned(),
    ))
}

/// Добавляет в соединение треки потока, которые ещё не были добавлены.
/// Возвращает число новых отправителей.
pub async fn attach_stream(
    pc: &RTCPeerConnection,
    stream: &MediaStream,
    attached: &mut HashSet<String>,
) -> Result<usize> {
    let mut added = 0;
    for track in &stream.tracks {
        let id = track.id().to_owned();
        if attached.contains(&id) {
            debug!(track = %id, "track already attached, skipping");
            continue;
        }

        let sender = pc
            .add_track(Arc::clone(track) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;
        attached.insert(id.clone());
        added += 1;
        debug!(track = %id, stream = %stream.id, "track attached");

        // RTCP нужно вычитывать, иначе интерсепторы не обработают NACK/PLI
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while let Ok((_, _)) = sender.read(&mut buf).await {}
        });
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn user_media_has_video_and_audio() {
        let stream = SyntheticDevices::new()
            .get_user_media(MediaConstraints::default())
            .await
            .unwrap();
        assert_eq!(stream.source, CaptureSource::User);
        assert_eq!(stream.tracks.len(), 2);
        assert!(stream.has_video());
        assert!(stream.tracks.iter().all(|t| t.stream_id() == stream.id));
    }

    #[tokio::test]
    async fn audio_only_constraint() {
        let stream = SyntheticDevices::new()
            .get_user_media(MediaConstraints {
                audio: true,
                video: false,
            })
            .await
            .unwrap();
        assert_eq!(stream.tracks.len(), 1);
        assert!(!stream.has_video());
    }

    #[tokio::test]
    async fn denied_devices_report_errors() {
        let devices = SyntheticDevices::new().deny_user().deny_display();
        assert!(matches!(
            devices.get_user_media(MediaConstraints::default()).await,
            Err(NegotiatorError::MediaAcquisition(_))
        ));
        assert!(matches!(
            devices.get_display_media().await,
            Err(NegotiatorError::DisplayCapture(_))
        ));
    }

    #[tokio::test]
    async fn display_media_is_single_video_track() {
        let stream = SyntheticDevices::new().get_display_media().await.unwrap();
        assert_eq!(stream.source, CaptureSource::Display);
        assert_eq!(stream.tracks.len(), 1);
        assert!(stream.track_ids()[0].starts_with("screen-"));
    }
}
