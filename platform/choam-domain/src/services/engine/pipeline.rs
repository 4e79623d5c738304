use crate::entities::metrics::{MetricsConfig, PerformanceSummary};
use crate::errors::EngineError;
use crate::repositories::bar_source::BarSource;
use crate::repositories::execution::ExecutionSink;
use crate::services::engine::controller::PositionController;
use crate::services::strategy::Strategy;
use crate::value_objects::bar::Bar;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::order::ExecutionRequest;
use crate::value_objects::trade::Trade;
use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, Span};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub strategy: String,
    pub summary: PerformanceSummary,
    pub trades: Vec<Trade>,
    pub equity: Vec<EquityPoint>,
    pub orders_executed: usize,
    /// Bars discarded because their timestamp did not advance.
    pub dropped_bars: usize,
}

/// A run that stopped early. `partial` covers every bar processed before the failure, plus the
/// failing bar when a stop exit was already filled on it.
#[derive(Debug, Error)]
#[error("run {} aborted: {error}", partial.run_id)]
pub struct RunAborted {
    pub error: EngineError,
    pub partial: RunReport,
}

/// Drives bars through strategy, controller and sink, one bar at a time.
///
/// Per bar: stop check, strategy evaluation, execution, equity update. Each execution is
/// awaited before the controller commits it, so at most one order is in flight.
pub struct Pipeline<S: Strategy> {
    run_id: String,
    strategy: S,
    controller: PositionController,
    metrics: MetricsConfig,
    equity: Vec<EquityPoint>,
    last_timestamp: Option<i64>,
    orders_executed: usize,
    dropped_bars: usize,
    span: Span,
}

impl<S: Strategy> Pipeline<S> {
    pub fn new(
        run_id: impl Into<String>,
        strategy: S,
        controller: PositionController,
        metrics: MetricsConfig,
        span: Span,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            strategy,
            controller,
            metrics,
            equity: Vec::new(),
            last_timestamp: None,
            orders_executed: 0,
            dropped_bars: 0,
            span,
        }
    }

    /// Consumes the source until it is exhausted, then computes the report.
    pub async fn run<B, X>(self, source: &mut B, sink: &mut X) -> Result<RunReport, RunAborted>
    where
        B: BarSource + ?Sized,
        X: ExecutionSink + ?Sized,
    {
        let span = self.span.clone();
        self.drive(source, sink).instrument(span).await
    }

    async fn drive<B, X>(mut self, source: &mut B, sink: &mut X) -> Result<RunReport, RunAborted>
    where
        B: BarSource + ?Sized,
        X: ExecutionSink + ?Sized,
    {
        tracing::info!(run_id = %self.run_id, strategy = self.strategy.name(), "run started");
        loop {
            let bar = match source.next_bar().await {
                Ok(Some(bar)) => bar,
                Ok(None) => break,
                Err(err) => return Err(self.abort(err)),
            };

            // Determinism: a bar that does not advance time is never consumed.
            if let Some(prev) = self.last_timestamp {
                if bar.timestamp <= prev {
                    self.dropped_bars += 1;
                    tracing::warn!(
                        timestamp = bar.timestamp,
                        previous = prev,
                        "dropping out-of-order bar"
                    );
                    continue;
                }
            }
            self.last_timestamp = Some(bar.timestamp);

            if let Err(err) = self.process_bar(&bar, sink).await {
                return Err(self.abort(err));
            }
        }

        let report = self.finish();
        tracing::info!(
            bars = report.summary.bars_processed,
            trades = report.summary.trades,
            cagr = report.summary.cagr,
            sharpe = report.summary.sharpe,
            max_drawdown = report.summary.max_drawdown,
            "run complete"
        );
        Ok(report)
    }

    async fn process_bar<X>(&mut self, bar: &Bar, sink: &mut X) -> Result<(), EngineError>
    where
        X: ExecutionSink + ?Sized,
    {
        let stopped = match self.controller.stop_exit(bar) {
            Some(request) => {
                self.execute(&request, bar, sink).await?;
                true
            }
            None => false,
        };

        let signal = self.strategy.on_bar(bar);
        let entry = match self.controller.signal_request(bar, signal) {
            Ok(Some(request)) => self.execute(&request, bar, sink).await,
            Ok(None) => Ok(()),
            Err(err) => Err(err),
        };

        // The stop fill already changed the position, so the bar keeps its equity point.
        if entry.is_ok() || stopped {
            self.equity.push(self.controller.mark_to_market(bar));
        }
        entry
    }

    async fn execute<X>(
        &mut self,
        request: &ExecutionRequest,
        bar: &Bar,
        sink: &mut X,
    ) -> Result<(), EngineError>
    where
        X: ExecutionSink + ?Sized,
    {
        sink.execute(&request.order, bar).await?;
        self.controller.apply(request, bar)?;
        self.orders_executed += 1;
        Ok(())
    }

    fn abort(self, error: EngineError) -> RunAborted {
        tracing::error!(kind = error.kind(), error = %error, "run aborted");
        RunAborted {
            error,
            partial: self.finish(),
        }
    }

    fn finish(self) -> RunReport {
        let strategy = self.strategy.name().to_string();
        let trades = self.controller.into_trades();
        let summary = PerformanceSummary::compute(&self.equity, &trades, &self.metrics);
        RunReport {
            run_id: self.run_id,
            strategy,
            summary,
            trades,
            equity: self.equity,
            orders_executed: self.orders_executed,
            dropped_bars: self.dropped_bars,
        }
    }
}
