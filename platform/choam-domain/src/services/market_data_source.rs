use crate::errors::EngineError;
use crate::repositories::bar_source::BarSource;
use crate::value_objects::bar::Bar;
use async_trait::async_trait;
use std::collections::VecDeque;

/// Finite in-memory bar source, drained front to back.
#[derive(Debug, Clone, Default)]
pub struct VecBarSource {
    bars: VecDeque<Bar>,
}

impl VecBarSource {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars: bars.into() }
    }

    pub fn remaining(&self) -> usize {
        self.bars.len()
    }
}

#[async_trait]
impl BarSource for VecBarSource {
    async fn next_bar(&mut self) -> Result<Option<Bar>, EngineError> {
        Ok(self.bars.pop_front())
    }
}
