use crate::errors::EngineError;
use crate::value_objects::bar::Bar;
use async_trait::async_trait;

/// Ordered stream of bars. Finite sources return `Ok(None)` once exhausted; live sources may
/// suspend indefinitely waiting for the next bar.
#[async_trait]
pub trait BarSource: Send {
    async fn next_bar(&mut self) -> Result<Option<Bar>, EngineError>;
}
