pub mod cli;
pub mod daemon;
pub mod load_config;

pub use cli::{run, Cli, Commands};
