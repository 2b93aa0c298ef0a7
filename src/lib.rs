// src/lib.rs

//! clipmine library
//!
//! Harvests short clips from a live-streaming platform's public API and
//! maintains an in-memory, concurrently-queryable index of them.

pub mod crawler;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod store;
pub mod utils;
