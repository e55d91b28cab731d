//! Data models

pub mod sensor;
pub mod alert;
pub mod audit;

pub use sensor::*;
pub use alert::*;
pub use audit::*;
