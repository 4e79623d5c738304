use crate::value_objects::side::Side;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub order_id: u64,
    pub side: Side,
    pub quantity: u64,
    pub price: f64,
    pub timestamp: i64,
}
