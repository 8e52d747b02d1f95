use repoforge::cli::commands::{CliArgs, Commands};
use repoforge::cli::handlers::{handle_call, handle_health, handle_serve, handle_tools};
use repoforge::util::logging::{config_from_env, init_logging, parse_level};
use repoforge::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("repoforge v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Serve => handle_serve().await,
        Commands::Call(call_args) => handle_call(call_args).await,
        Commands::Tools(format_args) => handle_tools(format_args).await,
        Commands::Health(format_args) => handle_health(format_args).await,
    };

    std::process::exit(exit_code);
}

/// Flags override `REPOFORGE_LOG_LEVEL`; `RUST_LOG` still wins over both
fn init_logging_from_args(args: &CliArgs) {
    let mut config = config_from_env();
    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    init_logging(config);
}
