//! NATS JetStream event sink
//!
//! Forwards normalized audit records to a JetStream stream with
//! at-least-once, ack-confirmed delivery.

mod config;
mod sink;

pub use config::{NatsConfig, StorageType};
pub use sink::NatsSink;
