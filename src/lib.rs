pub mod app;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod infra;
pub mod observability;
pub mod pipeline;
pub mod reporting;

pub use error::{CleanerError, Result};
