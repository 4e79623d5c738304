use thiserror::Error;

/// Failure taxonomy shared by every stage of a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Rejected at construction; the run never starts.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The execution sink could not carry out an order. Fatal to the run.
    #[error("execution failure: {0}")]
    ExecutionFailure(String),
    /// A component broke the contract of another one (e.g. a zero-quantity order).
    #[error("contract violation: {0}")]
    ContractViolation(String),
    #[error("bar source failure: {0}")]
    SourceFailure(String),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidConfiguration(_) => "invalid_configuration",
            EngineError::ExecutionFailure(_) => "execution_failure",
            EngineError::ContractViolation(_) => "contract_violation",
            EngineError::SourceFailure(_) => "source_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EngineError;

    #[test]
    fn display_carries_the_kind_and_message() {
        let err = EngineError::ExecutionFailure("broker rejected order 7".to_string());
        assert_eq!(err.to_string(), "execution failure: broker rejected order 7");
        assert_eq!(err.kind(), "execution_failure");
    }
}
