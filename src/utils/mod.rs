//! Utility functions and helpers.

pub mod http;
pub mod time;

pub use time::{format_duration, parse_time};
