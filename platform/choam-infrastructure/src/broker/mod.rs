//! HTTP adapters for a broker gateway: a connected session, a polling bar feed and an
//! order-forwarding execution sink.

pub mod feed;
pub mod reconnect;
pub mod session;
pub mod sink;
pub mod wire;

pub use feed::BrokerBarFeed;
pub use reconnect::ReconnectPolicy;
pub use session::{BrokerSession, BrokerSettings};
pub use sink::BrokerExecutionSink;
