pub mod controller;
pub mod pipeline;
