//! Realtime Module - Connection Hub & Message Envelopes
//!
//! Fan-out of alerts, sensor data and safety events to live subscribers.

pub mod envelope;
pub mod hub;

pub use envelope::{ControlMessage, Envelope};
pub use hub::ConnectionHub;
