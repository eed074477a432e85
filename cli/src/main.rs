//! CLI entrypoint for toolgate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use toolgate_application::{
    CircuitBreakerRegistry, ClientPool, ConnectionStore, InvokeToolError, InvokeToolInput,
    InvokeToolUseCase, TokenGuard,
};
use toolgate_domain::{ConnectionId, OrganizationId, ToolRequest, parse_tool_name};
use toolgate_infrastructure::{
    ConfigLoader, FileConfig, HttpClientFactory, HttpTokenExchanger, JsonFileConnectionStore,
    ProviderHttpError,
};
use toolgate_presentation::{Cli, Command, ConnectionArgs, ConsoleFormatter, OutputFormat};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for calls refused before reaching the provider.
const EXIT_DENIED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    info!("Starting toolgate");

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow::anyhow!("{e}"))?
    };
    config.validate().context("invalid configuration")?;

    match cli.command {
        Command::Parse { ref tool, ref provider } => {
            run_parse(cli.output, tool, provider.as_deref().unwrap_or_default())
        }
        Command::Check { ref tool, ref connection } => {
            run_check(cli.output, &config, tool, connection).await
        }
        Command::Call { ref tool, ref connection } => {
            run_call(cli.output, &config, tool, connection).await
        }
        Command::Connections { ref connections, ref org } => {
            run_connections(cli.output, &config, connections.clone(), org).await
        }
        Command::Config => run_config(cli.output, &cli.config, &config),
    }
}

fn run_parse(output: OutputFormat, tool: &str, provider: &str) -> Result<ExitCode> {
    match parse_tool_name(tool, provider) {
        Ok(parsed) => {
            match output {
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(&parsed)),
                OutputFormat::Text => println!("{}", ConsoleFormatter::format_parsed(tool, &parsed)),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            match output {
                OutputFormat::Json => println!(
                    "{}",
                    ConsoleFormatter::format_json(&serde_json::json!({ "error": e.to_string() }))
                ),
                OutputFormat::Text => eprintln!("{e}"),
            }
            Ok(ExitCode::from(EXIT_DENIED))
        }
    }
}

async fn run_check(
    output: OutputFormat,
    config: &FileConfig,
    tool: &str,
    args: &ConnectionArgs,
) -> Result<ExitCode> {
    let store = open_store(config, args.connections.clone()).await?;
    let use_case = build_use_case(config, Arc::clone(&store))?;
    let input = build_input(store.as_ref(), tool, args).await?;

    match use_case.resolve::<ProviderHttpError>(&input) {
        Ok(call) => {
            match output {
                OutputFormat::Json => println!(
                    "{}",
                    ConsoleFormatter::format_json(&serde_json::json!({ "allowed": true, "call": call }))
                ),
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_call(&call)),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => report_failure(output, &e),
    }
}

async fn run_call(
    output: OutputFormat,
    config: &FileConfig,
    tool: &str,
    args: &ConnectionArgs,
) -> Result<ExitCode> {
    let store = open_store(config, args.connections.clone()).await?;
    let use_case = build_use_case(config, Arc::clone(&store))?;
    let input = build_input(store.as_ref(), tool, args).await?;
    let reaper = use_case.pool().spawn_reaper();

    let result = use_case
        .execute(input, |client, call| async move {
            let body = call
                .resolved_arguments
                .unwrap_or_else(|| serde_json::json!({}));
            client.post_json(&call.resolved_tool_name, &body).await
        })
        .await;
    reaper.abort();

    match result {
        Ok(result) => {
            match output {
                OutputFormat::Json => println!(
                    "{}",
                    ConsoleFormatter::format_json(&serde_json::json!({
                        "call": result.call,
                        "result": result.value,
                    }))
                ),
                OutputFormat::Text => {
                    print!("{}", ConsoleFormatter::format_call(&result.call));
                    println!("{}", ConsoleFormatter::format_json(&result.value));
                    print!("{}", ConsoleFormatter::format_breakers(&use_case.pool().registry().snapshots()));
                    print!("{}", ConsoleFormatter::format_pool_stats(&use_case.pool().stats()));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => report_failure(output, &e),
    }
}

async fn run_connections(
    output: OutputFormat,
    config: &FileConfig,
    connections: Option<PathBuf>,
    org: &str,
) -> Result<ExitCode> {
    let store = open_store(config, connections).await?;
    let organization = OrganizationId::new(org);
    let mut listed = store.list_for_organization(&organization).await?;
    listed.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));

    match output {
        OutputFormat::Json => println!(
            "{}",
            ConsoleFormatter::format_json(&ConsoleFormatter::connections_json(&listed))
        ),
        OutputFormat::Text => print!("{}", ConsoleFormatter::format_connections(org, &listed)),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_config(
    output: OutputFormat,
    explicit: &Option<PathBuf>,
    config: &FileConfig,
) -> Result<ExitCode> {
    let sources = ConfigLoader::config_sources(explicit.as_deref());
    let params = config.to_isolation_params()?;
    let mut providers: Vec<&String> = config.providers.keys().collect();
    providers.sort();

    match output {
        OutputFormat::Json => {
            let sources: Vec<_> = sources
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "label": s.label,
                        "path": s.path,
                        "found": s.found,
                    })
                })
                .collect();
            println!(
                "{}",
                ConsoleFormatter::format_json(&serde_json::json!({
                    "sources": sources,
                    "isolation": params,
                    "providers": providers,
                    "connections_file": config.store.connections_file,
                }))
            );
        }
        OutputFormat::Text => {
            println!("Configuration sources:");
            for source in &sources {
                let path = source
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string());
                let mark = if source.found { "found" } else { "missing" };
                println!("  {:<10} {:<8} {}", source.label, mark, path);
            }
            print!("{}", ConsoleFormatter::format_params(&params));
            if !providers.is_empty() {
                let names: Vec<&str> = providers.iter().map(|p| p.as_str()).collect();
                println!("\nProviders: {}", names.join(", "));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Open the connection file named on the command line, or the configured one.
async fn open_store(
    config: &FileConfig,
    explicit: Option<PathBuf>,
) -> Result<Arc<JsonFileConnectionStore>> {
    let Some(path) = explicit.or_else(|| config.store.connections_file.clone()) else {
        bail!("no connections file: pass --connections or set store.connections_file");
    };
    let store = JsonFileConnectionStore::open(&path)
        .await
        .with_context(|| format!("failed to open connections file {}", path.display()))?;
    Ok(Arc::new(store))
}

// === Dependency Injection ===
fn build_use_case(
    config: &FileConfig,
    store: Arc<JsonFileConnectionStore>,
) -> Result<InvokeToolUseCase<HttpClientFactory>> {
    let params = config.to_isolation_params()?;
    let exchanger = Arc::new(HttpTokenExchanger::from_config(&config.oauth)?);
    let guard = TokenGuard::new(exchanger, store, params.token.clone());
    let registry = Arc::new(CircuitBreakerRegistry::new(params.clone()));
    let pool = ClientPool::new(registry, params.pool.clone(), guard);
    let factory = Arc::new(HttpClientFactory::new(&config.providers));
    Ok(InvokeToolUseCase::new(factory, pool))
}

async fn build_input(
    store: &dyn ConnectionStore,
    tool: &str,
    args: &ConnectionArgs,
) -> Result<InvokeToolInput> {
    let connection_id = ConnectionId::new(args.connection.as_str());
    let Some(connection) = store.find(&connection_id).await? else {
        bail!("connection not found: {}", connection_id);
    };

    let target = args
        .target
        .clone()
        .unwrap_or_else(|| connection.provider().to_string());
    let mut request = ToolRequest::new(tool, connection);
    if let Some(raw) = &args.arguments {
        let arguments: serde_json::Value =
            serde_json::from_str(raw).context("--arguments is not valid JSON")?;
        request = request.with_arguments(arguments);
    }

    Ok(InvokeToolInput::new(
        request,
        target,
        OrganizationId::new(args.org.as_str()),
    ))
}

fn report_failure(
    output: OutputFormat,
    error: &InvokeToolError<ProviderHttpError>,
) -> Result<ExitCode> {
    let exit = if error.is_caller_fixable() {
        ExitCode::from(EXIT_DENIED)
    } else {
        ExitCode::FAILURE
    };

    match (output, error.isolation()) {
        (OutputFormat::Json, Some(isolation)) => println!(
            "{}",
            ConsoleFormatter::format_json(&ConsoleFormatter::isolation_error_json(isolation))
        ),
        (OutputFormat::Text, Some(isolation)) => {
            print!("{}", ConsoleFormatter::format_isolation_error(isolation))
        }
        (OutputFormat::Json, None) => println!(
            "{}",
            ConsoleFormatter::format_json(&serde_json::json!({
                "allowed": !error.is_caller_fixable(),
                "upstream": error.is_upstream(),
                "message": error.to_string(),
            }))
        ),
        (OutputFormat::Text, None) => {
            warn!("{}", error);
            eprintln!("Error: {error}");
        }
    }
    Ok(exit)
}
