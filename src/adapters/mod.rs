//! Concrete adapter implementations for ports.

pub mod clock_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod replay_feed;
pub mod synthetic_feed;
