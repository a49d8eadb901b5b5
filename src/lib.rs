pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod instances;
pub mod prices;
pub mod report;
pub mod timerange;

pub use error::{AppError, Result};
