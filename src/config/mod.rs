//! Configuration loading and application.
mod apply;
mod loader;
mod parse;
pub mod types;

#[cfg(test)]
mod tests;

pub use apply::{endpoints_from, run_config_from, stress_config_from};
pub use loader::{DEFAULT_CONFIG_FILES, load_config, load_config_file};
pub(crate) use parse::parse_duration_value;
