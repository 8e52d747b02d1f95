use clap::{Parser, Subcommand, ValueEnum};

/// Turns repositories into callable tools, documentation and container images
#[derive(Parser, Debug)]
#[command(
    name = "repoforge",
    about = "Turns repositories into callable tools, documentation and container images",
    version,
    author,
    long_about = "repoforge archives and analyzes a repository, selects its important files, \
                  asks a code-intelligence backend for tool definitions, documentation and a \
                  build recipe, and can deploy the result as a container. Operations are \
                  exposed as tools over a stdio JSON-lines protocol."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only errors are logged"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Serve the tool protocol over stdin/stdout",
        long_about = "Reads one JSON request per line from stdin and writes one JSON reply per \
                      line to stdout. Supported methods: tools/list, tools/call.\n\n\
                      Example request:\n  \
                      {\"id\": 1, \"method\": \"tools/call\", \"params\": {\"name\": \"list-repositories\"}}"
    )]
    Serve,

    #[command(
        about = "Invoke a single tool",
        long_about = "Runs one tool call and prints its response envelope.\n\n\
                      Examples:\n  \
                      repoforge call analyze-and-generate --input '{\"repoId\": \"demo\"}'\n  \
                      repoforge call list-repositories"
    )]
    Call(CallArgs),

    #[command(about = "List the available tools with their input schemas")]
    Tools(FormatArgs),

    #[command(
        about = "Show configuration and backend availability",
        long_about = "Reports the effective configuration (without secrets), the code-intelligence \
                      backend and the container runtime.\n\n\
                      Examples:\n  \
                      repoforge health\n  \
                      repoforge health --format json"
    )]
    Health(FormatArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct CallArgs {
    #[arg(value_name = "TOOL", help = "Tool name, e.g. analyze-and-generate")]
    pub tool: String,

    #[arg(
        short = 'i',
        long,
        value_name = "JSON",
        default_value = "{}",
        help = "Tool input as a JSON object"
    )]
    pub input: String,

    #[arg(short = 'f', long, value_enum, default_value = "json", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct FormatArgs {
    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
