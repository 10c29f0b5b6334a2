// Конфигурация приложения
// Логирование можно отключить только в режиме разработки

use crate::peer::codec::Encoding;
use crate::peer::types::ServerConfig;
use std::net::SocketAddr;
use std::time::Duration;

#[cfg(debug_assertions)]
pub const LOGGING_ENABLED: bool = true; // В режиме отладки логирование включено

#[cfg(not(debug_assertions))]
pub const LOGGING_ENABLED: bool = false; // В продакшене логирование включается только через RUST_LOG

// Дополнительные настройки для режима разработки
#[cfg(debug_assertions)]
pub mod dev {
    // Для полного отключения логирования в режиме разработки
    // измените эту константу на false
    pub const ENABLE_LOGGING: bool = true;
}

#[cfg(not(debug_assertions))]
pub mod dev {
    pub const ENABLE_LOGGING: bool = false;
}

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8888/call";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8888";

/// Период отправки PLI, чтобы отправитель присылал ключевые кадры
pub const PLI_INTERVAL: Duration = Duration::from_secs(3);

/// Таймауты для каждого асинхронного шага
#[derive(Debug, Clone)]
pub struct Timeouts {
    pub media: Duration,
    pub offer: Duration,
    pub gathering: Duration,
    pub exchange: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            media: Duration::from_secs(60),
            offer: Duration::from_secs(10),
            gathering: Duration::from_secs(30),
            exchange: Duration::from_secs(30),
        }
    }
}

/// Настройки стороны, создающей offer
#[derive(Debug, Clone)]
pub struct NegotiatorConfig {
    pub endpoint: String,
    pub ice_servers: Vec<ServerConfig>,
    pub encoding: Encoding,
    pub timeouts: Timeouts,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            // как и в исходной странице: без STUN/TURN
            ice_servers: Vec::new(),
            encoding: Encoding::Plain,
            timeouts: Timeouts::default(),
        }
    }
}

/// Настройки отвечающей стороны (`/call`)
#[derive(Debug, Clone)]
pub struct AnswererConfig {
    pub listen: SocketAddr,
    pub ice_servers: Vec<ServerConfig>,
    pub encoding: Encoding,
    pub gathering_timeout: Duration,
    pub pli_interval: Duration,
}

impl Default for AnswererConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8888)),
            ice_servers: Vec::new(),
            encoding: Encoding::Plain,
            gathering_timeout: Duration::from_secs(30),
            pli_interval: PLI_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listen_matches_constant() {
        let parsed: SocketAddr = DEFAULT_LISTEN.parse().unwrap();
        assert_eq!(AnswererConfig::default().listen, parsed);
    }

    #[test]
    fn default_negotiator_has_no_ice_servers() {
        let cfg = NegotiatorConfig::default();
        assert!(cfg.ice_servers.is_empty());
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.encoding, Encoding::Plain);
    }
}
