//! Subcommand implementations.

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use serde_json::Value;

use crate::cli::Command;
use crate::config::Config;
use crate::context::{InvocationContext, ProcessEnv};
use crate::tools::declarative::{DefinitionLoader, HttpExecutor, LoadReport, effective_timeout};
use crate::tools::{Tool, ToolRegistry};

/// Parse a `KEY=VALUE` pair. The value may itself contain `=`.
pub fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Run a command against the resolved configuration.
pub async fn run_command(cmd: Command, config: Config) -> anyhow::Result<ExitCode> {
    match cmd {
        Command::List { verbose } => cmd_list(&config, verbose),
        Command::Validate => cmd_validate(&config),
        Command::Schema { name } => cmd_schema(&config, &name).await,
        Command::Call { name, params, env } => {
            cmd_call(&config, &name, &params, env.into_iter().collect()).await
        }
    }
}

fn load(config: &Config) -> LoadReport {
    DefinitionLoader::new(&config.http_tools.base_dir).load()
}

async fn registry(config: &Config) -> anyhow::Result<ToolRegistry> {
    let executor = HttpExecutor::new(Arc::new(ProcessEnv), config.http_tools.limits())?;
    let registry = ToolRegistry::new();
    registry
        .register_declarative(&config.http_tools.base_dir, Arc::new(executor))
        .await;
    Ok(registry)
}

fn cmd_list(config: &Config, verbose: bool) -> anyhow::Result<ExitCode> {
    let mut definitions = load(config).definitions;
    if definitions.is_empty() {
        println!(
            "No tool definitions found in {}",
            config.http_tools.base_dir.join("tools").display()
        );
        return Ok(ExitCode::SUCCESS);
    }
    definitions.sort_by(|a, b| a.name.cmp(&b.name));

    if verbose {
        println!(
            "{:<24} {:<7} {:>9} {:<30} DESCRIPTION",
            "NAME", "METHOD", "TIMEOUT", "ALLOWED HOSTS"
        );
        println!("{}", "-".repeat(100));
    } else {
        println!("{:<24} DESCRIPTION", "NAME");
        println!("{}", "-".repeat(60));
    }

    for def in &definitions {
        if verbose {
            let timeout =
                effective_timeout(def.request.timeout_ms, config.http_tools.default_timeout);
            println!(
                "{:<24} {:<7} {:>8}s {:<30} {}",
                def.name,
                def.request.method,
                timeout.as_secs_f32(),
                def.allowed_hosts.join(","),
                def.description
            );
        } else {
            println!("{:<24} {}", def.name, def.description);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_validate(config: &Config) -> anyhow::Result<ExitCode> {
    let report = load(config);

    for def in &report.definitions {
        println!("  ok    {}", def.name);
    }
    for rejected in &report.rejected {
        println!("  FAIL  {}", rejected.path.display());
        for violation in &rejected.violations {
            println!("          - {violation}");
        }
    }

    println!();
    println!(
        "{} valid, {} rejected",
        report.definitions.len(),
        report.rejected.len()
    );

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn find_tool(registry: &ToolRegistry, name: &str) -> anyhow::Result<Arc<dyn Tool>> {
    match registry.get(name).await {
        Some(tool) => Ok(tool),
        None => anyhow::bail!(
            "Unknown tool '{}'. Available: {}",
            name,
            registry.list().await.join(", ")
        ),
    }
}

async fn cmd_schema(config: &Config, name: &str) -> anyhow::Result<ExitCode> {
    let registry = registry(config).await?;
    let tool = find_tool(&registry, name).await?;
    println!("{}", serde_json::to_string_pretty(&tool.schema())?);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_call(
    config: &Config,
    name: &str,
    params: &str,
    env_overrides: HashMap<String, String>,
) -> anyhow::Result<ExitCode> {
    let params: Value = serde_json::from_str(params)
        .map_err(|e| anyhow::anyhow!("--params is not valid JSON: {e}"))?;

    let registry = registry(config).await?;
    let tool = find_tool(&registry, name).await?;

    let ctx = InvocationContext { env_overrides };
    let output = tool.execute(params, &ctx).await?;

    tracing::debug!(
        tool = name,
        elapsed_ms = output.duration.as_millis() as u64,
        "Call finished"
    );
    println!("{}", serde_json::to_string_pretty(&output.result)?);

    let success = output
        .result
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
