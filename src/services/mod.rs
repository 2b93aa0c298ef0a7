//! Upstream API services.

pub mod source;

pub use source::SourceClient;
