pub mod commands;
pub mod signals;

pub use commands::{Cli, Commands, run};
