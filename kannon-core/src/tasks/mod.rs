// kannon-core/src/tasks/mod.rs

pub mod attach_watcher;
pub mod control_loop;
pub mod fire_pulse;
