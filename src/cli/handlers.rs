//! Command handlers; each returns the process exit code

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{stdin, stdout, BufReader};
use tracing::{error, info};

use super::commands::{CallArgs, FormatArgs};
use super::output::{HealthReport, HealthStatus, OutputFormatter};
use crate::config::{ForgeConfig, RuntimeKind};
use crate::deploy::DockerRuntime;
use crate::tools::{ToolServer, ToolSystem};

fn load_system() -> Result<ToolSystem> {
    let config = ForgeConfig::from_env().context("Failed to load configuration")?;
    let system = ToolSystem::from_config(&config).context("Failed to initialise tool system")?;
    info!(
        intelligence = system.orchestrator().context().intelligence.name(),
        runtime = system.deployments().runtime_name(),
        "Tool system ready"
    );
    Ok(system)
}

fn exit_on_error(result: Result<i32>) -> i32 {
    result.unwrap_or_else(|e| {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        1
    })
}

pub async fn handle_serve() -> i32 {
    exit_on_error(serve().await)
}

async fn serve() -> Result<i32> {
    let system = load_system()?;
    ToolServer::new(&system)
        .serve(BufReader::new(stdin()), stdout())
        .await
        .context("Tool server I/O failed")?;
    Ok(0)
}

pub async fn handle_call(args: &CallArgs) -> i32 {
    exit_on_error(call(args).await)
}

async fn call(args: &CallArgs) -> Result<i32> {
    let input: Value = serde_json::from_str(&args.input)
        .with_context(|| format!("--input is not valid JSON: {}", args.input))?;
    let system = load_system()?;

    let response = system.execute(&args.tool, input).await;
    let rendered = OutputFormatter::new(args.format.into()).format_response(&response)?;
    println!("{}", rendered);

    Ok(if response.success { 0 } else { 1 })
}

pub async fn handle_tools(args: &FormatArgs) -> i32 {
    exit_on_error(tools(args))
}

fn tools(args: &FormatArgs) -> Result<i32> {
    let system = load_system()?;
    let rendered = OutputFormatter::new(args.format.into()).format_tools(&system.list_tools())?;
    println!("{}", rendered);
    Ok(0)
}

pub async fn handle_health(args: &FormatArgs) -> i32 {
    exit_on_error(health(args).await)
}

async fn health(args: &FormatArgs) -> Result<i32> {
    let config = ForgeConfig::from_env().context("Failed to load configuration")?;
    let report = build_health_report(&config).await;

    let rendered = OutputFormatter::new(args.format.into()).format_health(&report)?;
    println!("{}", rendered);
    Ok(if report.is_healthy() { 0 } else { 1 })
}

pub async fn build_health_report(config: &ForgeConfig) -> HealthReport {
    let intelligence = match config.create_intelligence() {
        Ok(backend) => {
            let status = HealthStatus::available(format!("{} backend configured", backend.name()));
            match backend.model_info() {
                Some(model) => status.with_details(model),
                None => status,
            }
        }
        Err(e) => HealthStatus::unavailable(e.to_string()),
    };

    let runtime = match config.runtime {
        RuntimeKind::Stub => HealthStatus::available("stub runtime (no containers are started)"),
        RuntimeKind::Docker => match DockerRuntime::connect() {
            Ok(docker) => match docker.ping().await {
                Ok(api_version) => HealthStatus::available("docker daemon reachable")
                    .with_details(format!("API version {}", api_version)),
                Err(e) => HealthStatus::unavailable(e.to_string()),
            },
            Err(e) => HealthStatus::unavailable(e.to_string()),
        },
    };

    HealthReport::new(config.to_display_map())
        .with_backend("intelligence", intelligence)
        .with_backend("runtime", runtime)
}
