pub mod duration;
pub mod loader;
pub mod types;

pub use duration::parse_duration;
pub use loader::{BASE_URL_ENV, ConfigLoader, ConfigOverrides};
pub use types::{LoadConfig, Stage};
