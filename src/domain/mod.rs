//! Core domain types and logic.

pub mod bar;
pub mod calendar;
pub mod config;
pub mod driver;
pub mod error;
pub mod resampler;
pub mod series;
pub mod timeframe;
