use serde::{Deserialize, Serialize};

/// Тело запроса к `/call`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub offer: String,
}

/// Тело успешного ответа `/call`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CallResponse {
    pub answer: String,
}

/// Тело ответа с ошибкой (HTTP 500)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Конфигурация ICE сервера
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub id: String,
    pub r#type: String, // 'stun' or 'turn'
    pub url: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl ServerConfig {
    /// Разбор строки вида `turn:host:3478?user=u&credential=c` или `stun:host`
    pub fn parse(entry: &str) -> Self {
        let (url, query) = match entry.split_once('?') {
            Some((url, query)) => (url, Some(query)),
            None => (entry, None),
        };

        let mut username = None;
        let mut credential = None;
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            match pair.split_once('=') {
                Some(("user", v)) | Some(("username", v)) => username = Some(v.to_string()),
                Some(("credential", v)) | Some(("password", v)) => {
                    credential = Some(v.to_string())
                }
                _ => {}
            }
        }

        let r#type = if url.starts_with("turn:") || url.starts_with("turns:") {
            "turn"
        } else {
            "stun"
        };

        Self {
            id: crate::utils::random_id(),
            r#type: r#type.into(),
            url: url.to_string(),
            username,
            credential,
        }
    }
}

/// Откуда получен поток
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    /// камера + микрофон
    User,
    /// захват экрана
    Display,
}
