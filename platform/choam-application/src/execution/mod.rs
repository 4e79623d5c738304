use async_trait::async_trait;
use choam_domain::errors::EngineError;
use choam_domain::repositories::execution::ExecutionSink;
use choam_domain::value_objects::bar::Bar;
use choam_domain::value_objects::fill::Fill;
use choam_domain::value_objects::order::Order;
use tracing::Span;

/// Backtest sink: fills every order at the reference bar's close. Never fails.
pub struct BookkeepingSink {
    fills: Vec<Fill>,
    next_order_id: u64,
    span: Span,
}

impl BookkeepingSink {
    pub fn new(span: Span) -> Self {
        Self {
            fills: Vec::new(),
            next_order_id: 1,
            span,
        }
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }
}

#[async_trait]
impl ExecutionSink for BookkeepingSink {
    async fn execute(&mut self, order: &Order, reference_bar: &Bar) -> Result<(), EngineError> {
        let fill = Fill {
            order_id: self.next_order_id,
            side: order.side,
            quantity: order.quantity,
            price: reference_bar.close,
            timestamp: reference_bar.timestamp,
        };
        self.next_order_id += 1;
        self.span.in_scope(|| {
            tracing::debug!(
                order_id = fill.order_id,
                side = %fill.side,
                quantity = fill.quantity,
                price = fill.price,
                "filled"
            )
        });
        metrics::counter!(
            "choam.orders.executed",
            "mode" => "backtest",
            "side" => order.side.as_str()
        )
        .increment(1);
        self.fills.push(fill);
        Ok(())
    }
}
