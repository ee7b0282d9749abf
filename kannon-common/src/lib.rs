//! kannon-common/src/lib.rs
//!
//! Data models, hardware board traits and error types shared by the
//! control core and the binary.

pub mod error;
pub mod models;
pub mod traits;

pub use error::{ActuatorError, Error, NotReadyReason};
