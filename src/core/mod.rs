pub mod config;
pub mod error;
pub mod types;

pub use config::CoordinatorConfig;
pub use error::{CoordinatorError, Result};
