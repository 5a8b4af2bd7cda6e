pub mod args;
pub mod install;

pub use args::{Cli, Commands};
