use super::session::BrokerSettings;
use super::wire::BarsResponse;
use async_trait::async_trait;
use choam_domain::errors::EngineError;
use choam_domain::repositories::bar_source::BarSource;
use choam_domain::value_objects::bar::Bar;
use reqwest::Client;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::Span;
use url::Url;

/// Live bar source that polls the gateway for bars newer than the last one delivered.
/// It never reports exhaustion; it waits `poll_interval` whenever nothing new is available.
pub struct BrokerBarFeed {
    client: Client,
    bars_url: Url,
    session_id: String,
    symbol: String,
    bar_size_seconds: u64,
    poll_interval: Duration,
    max_poll_failures: u32,
    last_timestamp: Option<i64>,
    pending: VecDeque<Bar>,
    consecutive_failures: u32,
    span: Span,
}

impl BrokerBarFeed {
    pub(crate) fn new(
        client: Client,
        bars_url: Url,
        session_id: String,
        settings: &BrokerSettings,
        span: Span,
    ) -> Self {
        Self {
            client,
            bars_url,
            session_id,
            symbol: settings.symbol.clone(),
            bar_size_seconds: settings.bar_size_seconds,
            poll_interval: settings.poll_interval,
            max_poll_failures: settings.max_poll_failures.max(1),
            last_timestamp: None,
            pending: VecDeque::new(),
            consecutive_failures: 0,
            span,
        }
    }

    fn poll_url(&self) -> Url {
        let mut url = self.bars_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("session", &self.session_id)
                .append_pair("symbol", &self.symbol)
                .append_pair("bar_size", &self.bar_size_seconds.to_string());
            if let Some(after) = self.newest_known() {
                pairs.append_pair("after", &after.to_string());
            }
        }
        url
    }

    fn newest_known(&self) -> Option<i64> {
        self.pending
            .back()
            .map(|bar| bar.timestamp)
            .or(self.last_timestamp)
    }

    async fn poll(&self) -> Result<Vec<Bar>, String> {
        let start = Instant::now();
        let resp = self
            .client
            .get(self.poll_url())
            .send()
            .await
            .map_err(|err| format!("bar poll failed: {err}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("bar poll http error: status {}", status.as_u16()));
        }
        let parsed = resp
            .json::<BarsResponse>()
            .await
            .map_err(|err| format!("failed to parse bars response: {err}"))?;
        metrics::histogram!("choam.broker.poll_ms").record(start.elapsed().as_millis() as f64);
        Ok(parsed.bars.into_iter().map(Bar::from).collect())
    }

    /// Queues bars strictly newer than anything already delivered or queued.
    fn enqueue(&mut self, mut bars: Vec<Bar>) -> usize {
        bars.sort_by_key(|bar| bar.timestamp);
        let mut added = 0;
        for bar in bars {
            if self.newest_known().is_some_and(|newest| bar.timestamp <= newest) {
                continue;
            }
            self.pending.push_back(bar);
            added += 1;
        }
        added
    }
}

#[async_trait]
impl BarSource for BrokerBarFeed {
    async fn next_bar(&mut self) -> Result<Option<Bar>, EngineError> {
        loop {
            if let Some(bar) = self.pending.pop_front() {
                self.last_timestamp = Some(bar.timestamp);
                metrics::counter!("choam.broker.bars_received").increment(1);
                return Ok(Some(bar));
            }

            match self.poll().await {
                Ok(bars) => {
                    self.consecutive_failures = 0;
                    if self.enqueue(bars) > 0 {
                        continue;
                    }
                }
                Err(err) => {
                    self.consecutive_failures += 1;
                    metrics::counter!("choam.broker.poll_failures").increment(1);
                    if self.consecutive_failures >= self.max_poll_failures {
                        self.span.in_scope(|| {
                            tracing::error!(
                                failures = self.consecutive_failures,
                                error = %err,
                                "bar feed giving up"
                            )
                        });
                        return Err(EngineError::SourceFailure(format!(
                            "bar feed failed {} consecutive polls: {err}",
                            self.consecutive_failures
                        )));
                    }
                    self.span.in_scope(|| {
                        tracing::warn!(
                            failures = self.consecutive_failures,
                            error = %err,
                            "bar poll failed"
                        )
                    });
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
