pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CallArgs, CliArgs, Commands, FormatArgs};
pub use output::{HealthReport, HealthStatus, OutputFormat, OutputFormatter};
