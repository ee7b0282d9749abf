// kannon-core/src/lib.rs

pub mod config;
pub mod eventbus;
pub mod tracking;
pub mod motion;
pub mod fire_control;
pub mod actuators;
pub mod services;
pub mod tasks;
pub mod test_utils;

pub use config::ControlConfig;
pub use kannon_common::Error;
pub use services::ControlService;
