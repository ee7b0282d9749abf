// File: kannon-common/src/traits/mod.rs
pub mod hardware_traits;

pub use hardware_traits::{RelayBoard, ServoBoard};
