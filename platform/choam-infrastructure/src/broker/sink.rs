use super::wire::{OrderAck, OrderRequest, ORDER_TYPE_MARKET};
use async_trait::async_trait;
use choam_domain::errors::EngineError;
use choam_domain::repositories::execution::ExecutionSink;
use choam_domain::value_objects::bar::Bar;
use choam_domain::value_objects::order::Order;
use rand::RngCore;
use reqwest::Client;
use std::time::Instant;
use tracing::Span;
use url::Url;

/// Forwards market orders to the gateway and waits for the acknowledgement.
/// Anything other than an accepted ack is an `ExecutionFailure`; nothing is retried here.
pub struct BrokerExecutionSink {
    client: Client,
    orders_url: Url,
    session_id: String,
    symbol: String,
    submitted: u64,
    span: Span,
}

impl BrokerExecutionSink {
    pub(crate) fn new(
        client: Client,
        orders_url: Url,
        session_id: String,
        symbol: String,
        span: Span,
    ) -> Self {
        Self {
            client,
            orders_url,
            session_id,
            symbol,
            submitted: 0,
            span,
        }
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    async fn submit(&self, request: &OrderRequest) -> Result<OrderAck, String> {
        let resp = self
            .client
            .post(self.orders_url.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| format!("order request failed: {err}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!(
                "order http error: status {} {}",
                status.as_u16(),
                body.trim()
            ));
        }
        let ack = resp
            .json::<OrderAck>()
            .await
            .map_err(|err| format!("failed to parse order ack: {err}"))?;
        if ack.is_rejected() {
            return Err(format!(
                "order rejected: {}",
                ack.message.as_deref().unwrap_or("no reason given")
            ));
        }
        Ok(ack)
    }
}

fn client_order_id(seq: u64) -> String {
    let mut rng = rand::thread_rng();
    format!("{:016x}-{seq}", rng.next_u64())
}

#[async_trait]
impl ExecutionSink for BrokerExecutionSink {
    async fn execute(&mut self, order: &Order, reference_bar: &Bar) -> Result<(), EngineError> {
        self.submitted += 1;
        let request = OrderRequest {
            session_id: self.session_id.clone(),
            client_order_id: client_order_id(self.submitted),
            symbol: self.symbol.clone(),
            action: order.side,
            quantity: order.quantity,
            order_type: ORDER_TYPE_MARKET.to_string(),
            reference_price: reference_bar.close,
            reference_timestamp: reference_bar.timestamp,
        };

        let start = Instant::now();
        let result = self.submit(&request).await;
        metrics::histogram!("choam.broker.order_ack_ms").record(start.elapsed().as_millis() as f64);

        match result {
            Ok(ack) => {
                self.span.in_scope(|| {
                    tracing::info!(
                        client_order_id = %request.client_order_id,
                        order_id = ack.order_id.as_deref().unwrap_or(""),
                        side = %order.side,
                        quantity = order.quantity,
                        status = %ack.status,
                        "order acknowledged"
                    )
                });
                metrics::counter!(
                    "choam.orders.executed",
                    "mode" => "live",
                    "side" => order.side.as_str()
                )
                .increment(1);
                Ok(())
            }
            Err(err) => {
                self.span.in_scope(|| {
                    tracing::error!(
                        client_order_id = %request.client_order_id,
                        side = %order.side,
                        quantity = order.quantity,
                        error = %err,
                        "order failed"
                    )
                });
                metrics::counter!("choam.orders.failed", "side" => order.side.as_str())
                    .increment(1);
                Err(EngineError::ExecutionFailure(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::client_order_id;

    #[test]
    fn client_order_ids_are_unique_and_sequenced() {
        let first = client_order_id(1);
        let second = client_order_id(2);
        assert_ne!(first, second);
        assert!(first.ends_with("-1"));
        assert_eq!(first.len(), 18);
    }
}
