// Wed Jan 15 2026 - Alex

pub mod cli;
pub mod output;
pub mod report;

pub use cli::{Args, Command, CommandHandler};
pub use output::DualOutput;
