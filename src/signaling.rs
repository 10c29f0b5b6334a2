use crate::error::{NegotiatorError, Result};
use crate::peer::codec::fingerprint;
use crate::peer::types::{CallRequest, CallResponse, ErrorResponse};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// Один обмен запрос/ответ: закодированный offer → закодированный answer
#[async_trait]
pub trait NegotiationEndpoint: Send + Sync {
    async fn exchange(&self, offer: &str) -> Result<String>;
}

/// POST `{"offer": ...}` → `{"answer": ...}`
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl NegotiationEndpoint for HttpEndpoint {
    async fn exchange(&self, offer: &str) -> Result<String> {
        info!(url = %self.url, fingerprint = %fingerprint(offer), "submitting offer");
        let resp = self
            .client
            .post(&self.url)
            .json(&CallRequest {
                offer: offer.to_string(),
            })
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        debug!(%status, len = text.len(), "negotiation endpoint replied");

        if !status.is_success() {
            let msg = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("{status}: {text}"));
            return Err(NegotiatorError::Endpoint(msg));
        }

        let body: CallResponse = serde_json::from_str(&text)?;
        Ok(body.answer)
    }
}

/// Ручной обмен: offer уже показан пользователю, answer вставляется в stdin
#[derive(Default)]
pub struct StdinEndpoint;

#[async_trait]
impl NegotiationEndpoint for StdinEndpoint {
    async fn exchange(&self, offer: &str) -> Result<String> {
        eprintln!(
            "Offer {} is ready. Paste the base64 answer and press Enter:",
            fingerprint(offer)
        );
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        match lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(NegotiatorError::Endpoint("stdin closed".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_offer_and_returns_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/call"))
            .and(body_json(serde_json::json!({ "offer": "b2ZmZXI=" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "answer": "YW5zd2Vy" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = HttpEndpoint::new(format!("{}/call", server.uri()));
        assert_eq!(endpoint.exchange("b2ZmZXI=").await.unwrap(), "YW5zd2Vy");
    }

    #[tokio::test]
    async fn empty_offer_is_sent_as_is() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({ "offer": "" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "answer": "" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = HttpEndpoint::new(format!("{}/call", server.uri()));
        assert_eq!(endpoint.exchange("").await.unwrap(), "");
    }

    #[tokio::test]
    async fn server_error_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "success": false,
                "error": "failed to decode request"
            })))
            .mount(&server)
            .await;

        let endpoint = HttpEndpoint::new(format!("{}/call", server.uri()));
        match endpoint.exchange("x").await {
            Err(NegotiatorError::Endpoint(msg)) => assert_eq!(msg, "failed to decode request"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_answer_field_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "nope": 1 })))
            .mount(&server)
            .await;

        let endpoint = HttpEndpoint::new(format!("{}/call", server.uri()));
        assert!(matches!(
            endpoint.exchange("x").await,
            Err(NegotiatorError::Json(_))
        ));
    }
}
