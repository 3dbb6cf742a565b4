pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod runner;
pub mod scenario;
pub mod utils;

// Re-export commonly used types
pub use error::{PrloadError, Result};
