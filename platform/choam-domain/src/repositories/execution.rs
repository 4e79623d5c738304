use crate::errors::EngineError;
use crate::value_objects::bar::Bar;
use crate::value_objects::order::Order;
use async_trait::async_trait;

/// Performs or records an order. A failure is reported as `EngineError::ExecutionFailure`
/// and is never retried by the caller.
#[async_trait]
pub trait ExecutionSink: Send {
    async fn execute(&mut self, order: &Order, reference_bar: &Bar) -> Result<(), EngineError>;
}
