pub mod formatter;

pub use formatter::{format_duration, format_latency, format_rate};
