// src/models/mod.rs

//! Domain models and configuration structures.

pub mod channel;
pub mod clip;
pub mod config;

pub use channel::Channel;
pub use clip::Clip;
pub use config::{ApiConfig, Config, CrawlerConfig, RankingConfig, SnapshotConfig};
