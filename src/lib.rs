pub mod config;
pub mod core;
pub mod logging;

pub use config::Settings;
pub use core::coordinator::Coordinator;
pub use core::partition::{CameraPartition, GlobalPartition};
