use crate::entities::risk::RiskConfig;
use crate::errors::EngineError;
use crate::value_objects::bar::Bar;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::order::{ExecutionRequest, Order, OrderReason};
use crate::value_objects::position::{OpenPosition, PositionState};
use crate::value_objects::side::Side;
use crate::value_objects::trade::Trade;
use tracing::Span;

/// FLAT/LONG state machine for a single instrument.
///
/// Requests are computed from the current state without mutating it; the caller commits a
/// request with [`PositionController::apply`] once the execution sink has accepted it.
pub struct PositionController {
    risk: RiskConfig,
    state: PositionState,
    initial_cash: f64,
    cash: f64,
    trades: Vec<Trade>,
    span: Span,
}

impl PositionController {
    pub fn new(risk: RiskConfig, initial_cash: f64, span: Span) -> Result<Self, EngineError> {
        risk.validate()?;
        if !initial_cash.is_finite() {
            return Err(EngineError::InvalidConfiguration(
                "initial cash must be finite".to_string(),
            ));
        }
        Ok(Self {
            risk,
            state: PositionState::Flat,
            initial_cash,
            cash: initial_cash,
            trades: Vec::new(),
            span,
        })
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }

    /// Full-quantity SELL when the bar closes at or below the stop price of the open position.
    pub fn stop_exit(&self, bar: &Bar) -> Option<ExecutionRequest> {
        let open = self.state.open()?;
        let stop_price = self.risk.stop_price(open.entry_price)?;
        if bar.close > stop_price {
            return None;
        }
        Some(ExecutionRequest {
            order: Order::sell(open.quantity),
            reason: OrderReason::StopLoss,
        })
    }

    /// Maps a strategy signal onto the current state. BUY while LONG and SELL while FLAT
    /// are no-ops. A BUY always uses the configured trade quantity.
    pub fn signal_request(
        &self,
        bar: &Bar,
        signal: Option<Order>,
    ) -> Result<Option<ExecutionRequest>, EngineError> {
        let Some(order) = signal else {
            return Ok(None);
        };
        if order.quantity == 0 {
            return Err(EngineError::ContractViolation(format!(
                "strategy emitted {} with zero quantity at {}",
                order.side, bar.timestamp
            )));
        }
        let request = match (order.side, self.state) {
            (Side::Buy, PositionState::Flat) => Some(ExecutionRequest {
                order: Order::buy(self.risk.trade_qty),
                reason: OrderReason::Entry,
            }),
            (Side::Sell, PositionState::Long(open)) => Some(ExecutionRequest {
                order: Order::sell(open.quantity),
                reason: OrderReason::SignalExit,
            }),
            _ => None,
        };
        Ok(request)
    }

    /// Commits an executed request at the bar's close.
    pub fn apply(&mut self, request: &ExecutionRequest, bar: &Bar) -> Result<(), EngineError> {
        let _guard = self.span.enter();
        match (request.order.side, self.state) {
            (Side::Buy, PositionState::Flat) => {
                self.state = PositionState::Long(OpenPosition {
                    quantity: request.order.quantity,
                    entry_price: bar.close,
                    entry_timestamp: bar.timestamp,
                });
                tracing::info!(
                    timestamp = bar.timestamp,
                    price = bar.close,
                    quantity = request.order.quantity,
                    "position opened"
                );
                Ok(())
            }
            (Side::Sell, PositionState::Long(open)) => {
                let trade = Trade {
                    entry_timestamp: open.entry_timestamp,
                    exit_timestamp: bar.timestamp,
                    entry_price: open.entry_price,
                    exit_price: bar.close,
                    quantity: open.quantity,
                    exit_reason: request.reason,
                };
                let pnl = trade.pnl();
                self.cash += pnl;
                self.state = PositionState::Flat;
                if request.reason == OrderReason::StopLoss {
                    tracing::info!(
                        timestamp = bar.timestamp,
                        entry_price = open.entry_price,
                        price = bar.close,
                        pnl,
                        "stop-loss hit"
                    );
                } else {
                    tracing::info!(timestamp = bar.timestamp, price = bar.close, pnl, "position closed");
                }
                self.trades.push(trade);
                Ok(())
            }
            (side, state) => Err(EngineError::ContractViolation(format!(
                "cannot apply {side} while {}",
                if state.is_long() { "LONG" } else { "FLAT" }
            ))),
        }
    }

    pub fn mark_to_market(&self, bar: &Bar) -> EquityPoint {
        let (position_qty, unrealized_pnl, position_value) = match self.state {
            PositionState::Flat => (0, 0.0, 0.0),
            PositionState::Long(open) => {
                let qty = open.quantity as f64;
                (
                    open.quantity,
                    qty * (bar.close - open.entry_price),
                    qty * bar.close,
                )
            }
        };
        EquityPoint {
            timestamp: bar.timestamp,
            equity: self.cash + position_value,
            cash: self.cash,
            position_qty,
            unrealized_pnl,
            realized_pnl: self.cash - self.initial_cash,
        }
    }
}
