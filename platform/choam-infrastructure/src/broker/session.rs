use super::feed::BrokerBarFeed;
use super::reconnect::ReconnectPolicy;
use super::sink::BrokerExecutionSink;
use super::wire::{SessionRequest, SessionResponse};
use reqwest::Client;
use std::time::Duration;
use tracing::Span;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerSettings {
    pub url: String,
    pub client_id: u32,
    pub symbol: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub bar_size_seconds: u64,
    /// Consecutive failed bar polls tolerated before the feed reports a source failure.
    pub max_poll_failures: u32,
}

pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url, String> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|err| format!("invalid broker endpoint {raw}: {err}"))
}

/// A registered session with the broker gateway. The feed and sink it hands out share the
/// session id and HTTP client.
pub struct BrokerSession {
    client: Client,
    settings: BrokerSettings,
    session_id: String,
}

impl BrokerSession {
    pub async fn connect(
        settings: BrokerSettings,
        policy: &ReconnectPolicy,
        span: &Span,
    ) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        let session_url = endpoint(&settings.url, "v1/session")?;
        let request = SessionRequest {
            client_id: settings.client_id,
            symbol: settings.symbol.clone(),
        };

        let response = policy
            .retry("broker connect", span, |_attempt| {
                let client = client.clone();
                let session_url = session_url.clone();
                let request = request.clone();
                async move { open_session(&client, session_url, &request).await }
            })
            .await?;

        span.in_scope(|| {
            tracing::info!(
                url = %settings.url,
                client_id = settings.client_id,
                session_id = %response.session_id,
                "broker session established"
            )
        });
        Ok(Self {
            client,
            settings,
            session_id: response.session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn bar_feed(&self, span: Span) -> Result<BrokerBarFeed, String> {
        Ok(BrokerBarFeed::new(
            self.client.clone(),
            endpoint(&self.settings.url, "v1/bars")?,
            self.session_id.clone(),
            &self.settings,
            span,
        ))
    }

    pub fn execution_sink(&self, span: Span) -> Result<BrokerExecutionSink, String> {
        Ok(BrokerExecutionSink::new(
            self.client.clone(),
            endpoint(&self.settings.url, "v1/orders")?,
            self.session_id.clone(),
            self.settings.symbol.clone(),
            span,
        ))
    }
}

async fn open_session(
    client: &Client,
    url: Url,
    request: &SessionRequest,
) -> Result<SessionResponse, String> {
    let resp = client
        .post(url)
        .json(request)
        .send()
        .await
        .map_err(|err| format!("session request failed: {err}"))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(format!("session http error: status {}", status.as_u16()));
    }
    let parsed = resp
        .json::<SessionResponse>()
        .await
        .map_err(|err| format!("failed to parse session response: {err}"))?;
    if parsed.session_id.trim().is_empty() {
        return Err("broker returned an empty session_id".to_string());
    }
    Ok(parsed)
}
