use crate::errors::EngineError;
use crate::services::features::PriceWindow;
use crate::value_objects::bar::Bar;
use crate::value_objects::order::Order;
use tracing::Span;

pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Called exactly once per bar, in bar order.
    fn on_bar(&mut self, bar: &Bar) -> Option<Order>;
}

/// Moving-average crossover over closing prices.
///
/// Emits BUY when `fast_ma - slow_ma` turns positive and SELL when it turns negative.
/// Nothing is emitted until `slow` closes have been observed.
pub struct SmaCrossover {
    fast: usize,
    quantity: u64,
    window: PriceWindow,
    prev_diff: f64,
    span: Span,
}

impl SmaCrossover {
    pub fn new(fast: usize, slow: usize, quantity: u64, span: Span) -> Result<Self, EngineError> {
        if fast == 0 || fast >= slow {
            return Err(EngineError::InvalidConfiguration(format!(
                "strategy windows must satisfy 0 < fast < slow (got fast={fast}, slow={slow})"
            )));
        }
        if quantity == 0 {
            return Err(EngineError::InvalidConfiguration(
                "strategy quantity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            fast,
            quantity,
            window: PriceWindow::new(slow),
            prev_diff: 0.0,
            span,
        })
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        "sma_crossover"
    }

    fn on_bar(&mut self, bar: &Bar) -> Option<Order> {
        self.window.push(bar.close);
        if !self.window.is_full() {
            return None;
        }
        let (Some(fast_ma), Some(slow_ma)) =
            (self.window.mean_recent(self.fast), self.window.mean())
        else {
            return None;
        };

        let diff = fast_ma - slow_ma;
        let signal = if self.prev_diff <= 0.0 && diff > 0.0 {
            Some(Order::buy(self.quantity))
        } else if self.prev_diff >= 0.0 && diff < 0.0 {
            Some(Order::sell(self.quantity))
        } else {
            None
        };
        self.prev_diff = diff;

        if let Some(order) = &signal {
            let _guard = self.span.enter();
            tracing::debug!(
                timestamp = bar.timestamp,
                side = %order.side,
                fast_ma,
                slow_ma,
                "crossover"
            );
        }
        signal
    }
}
