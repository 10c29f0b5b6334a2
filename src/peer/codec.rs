use crate::error::{NegotiatorError, Result};
use base64::{engine::general_purpose, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Ограничение размера распакованных данных (защита от zip-bomb)
pub const MAX_DECOMPRESSED_SIZE: u64 = 256 * 1024; // 256 KiB

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Способ упаковки описания сессии перед base64
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Encoding {
    /// base64(JSON), совместимо с `btoa(JSON.stringify(desc))`
    #[default]
    Plain,
    /// base64(gzip(JSON)), короче для копирования вручную
    Gzip,
}

pub fn encode(desc: &RTCSessionDescription, encoding: Encoding) -> Result<String> {
    // 1. JSON -> bytes
    let json = serde_json::to_vec(desc)?;

    // 2. GZIP (по желанию)
    let bytes = match encoding {
        Encoding::Plain => json,
        Encoding::Gzip => {
            let mut gz = GzEncoder::new(Vec::new(), Compression::fast());
            gz.write_all(&json)?;
            gz.finish()?
        }
    };

    // 3. base64
    Ok(general_purpose::STANDARD.encode(bytes))
}

pub fn decode(s: &str) -> Result<RTCSessionDescription> {
    // 1. base64 -> bytes; пробелы по краям остаются после копирования
    let raw = general_purpose::STANDARD.decode(s.trim())?;

    // 2. gunzip, если это gzip
    let json = if raw.starts_with(&GZIP_MAGIC) {
        inflate(&raw)?
    } else {
        raw
    };

    // 3. JSON -> struct
    Ok(serde_json::from_slice(&json)?)
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    let gz = GzDecoder::new(compressed);
    let mut json = Vec::new();
    gz.take(MAX_DECOMPRESSED_SIZE + 1).read_to_end(&mut json)?;
    if json.len() as u64 > MAX_DECOMPRESSED_SIZE {
        return Err(NegotiatorError::PayloadTooLarge {
            limit: MAX_DECOMPRESSED_SIZE,
        });
    }
    Ok(json)
}

/// Короткий отпечаток закодированного описания: 48 бит SHA-256 в hex
pub fn fingerprint(encoded: &str) -> String {
    let digest = Sha256::digest(encoded.trim().as_bytes());
    hex::encode(&digest[..6])
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;

    const SDP: &str = "v=0\r\no=- 4215775240449105457 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
a=group:BUNDLE 0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\nc=IN IP4 0.0.0.0\r\na=mid:0\r\n\
a=rtpmap:96 VP8/90000\r\na=candidate:1 1 udp 2130706431 192.168.1.4 50000 typ host\r\n";

    fn offer() -> RTCSessionDescription {
        serde_json::from_value(serde_json::json!({ "type": "offer", "sdp": SDP })).unwrap()
    }

    #[test]
    fn plain_is_base64_of_browser_json() {
        let encoded = encode(&offer(), Encoding::Plain).unwrap();
        let json = general_purpose::STANDARD.decode(&encoded).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["type"], "offer");
        assert_eq!(value["sdp"], SDP);
    }

    #[test]
    fn reencoding_is_byte_identical() {
        for encoding in [Encoding::Plain, Encoding::Gzip] {
            let first = encode(&offer(), encoding).unwrap();
            let decoded = decode(&first).unwrap();
            assert_eq!(decoded.sdp_type, RTCSdpType::Offer);
            assert_eq!(decoded.sdp, SDP);
            assert_eq!(encode(&decoded, encoding).unwrap(), first);
        }
    }

    #[test]
    fn decode_tolerates_pasted_whitespace() {
        let encoded = encode(&offer(), Encoding::Gzip).unwrap();
        let pasted = format!("  {encoded}\n");
        assert_eq!(decode(&pasted).unwrap().sdp, SDP);
        assert_eq!(fingerprint(&pasted), fingerprint(&encoded));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode("not base64 at all!"),
            Err(NegotiatorError::Base64(_))
        ));
        let not_json = general_purpose::STANDARD.encode("hello");
        assert!(matches!(decode(&not_json), Err(NegotiatorError::Json(_))));
    }

    #[test]
    fn decode_caps_decompressed_size() {
        let huge = serde_json::json!({ "type": "offer", "sdp": "a".repeat(300 * 1024) });
        let mut gz = GzEncoder::new(Vec::new(), Compression::fast());
        gz.write_all(huge.to_string().as_bytes()).unwrap();
        let encoded = general_purpose::STANDARD.encode(gz.finish().unwrap());

        assert!(matches!(
            decode(&encoded),
            Err(NegotiatorError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn fingerprint_is_twelve_hex_chars() {
        let fp = fingerprint("abc");
        assert_eq!(fp.len(), 12);
        assert_ne!(fp, fingerprint("abd"));
    }
}
