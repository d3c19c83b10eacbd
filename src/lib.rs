pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod logging;
pub mod view;

// Re-export for convenience
pub use crate::api::{GameApi, HttpGameApi};
pub use crate::core::controller::{Controller, Settings};
pub use crate::core::driver::Driver;
