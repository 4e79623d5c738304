#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenPosition {
    pub quantity: u64,
    pub entry_price: f64,
    pub entry_timestamp: i64,
}

/// Single-instrument position. `Long` always carries a positive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long(OpenPosition),
}

impl PositionState {
    pub fn is_long(&self) -> bool {
        matches!(self, PositionState::Long(_))
    }

    pub fn quantity(&self) -> u64 {
        match self {
            PositionState::Flat => 0,
            PositionState::Long(open) => open.quantity,
        }
    }

    pub fn open(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Flat => None,
            PositionState::Long(open) => Some(open),
        }
    }
}
