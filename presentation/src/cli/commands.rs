//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// CLI arguments for toolgate
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(author, version, about = "Tenant-isolated, circuit-broken tool execution")]
#[command(long_about = r#"
toolgate checks and runs tool calls against third-party SaaS connections.

Every call is validated before it leaves the process:
1. The tool name must carry the connection's namespace (notion__getTasks)
2. The connection must belong to the caller's organization
3. The router's target namespace must match the tool's namespace

Calls then go through a per-provider circuit breaker, an OAuth token
refresh when the token is about to expire, and a pooled provider client.

Configuration files are loaded from (in priority order):
1. TOOLGATE_* environment variables
2. --config <path>     Explicit config file
3. ./toolgate.toml     Project-level config
4. ~/.config/toolgate/config.toml   Global config

Example:
  toolgate parse notion__getTasks
  toolgate check notion__getTasks --connections connections.json --connection conn-1 --org org-a
  toolgate call notion__search --connection conn-1 --org org-a --arguments '{"query":"tasks"}'
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,
}

/// Connection selection shared by `check` and `call`
#[derive(clap::Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// JSON file holding connection records (defaults to store.connections_file)
    #[arg(long, value_name = "FILE")]
    pub connections: Option<PathBuf>,

    /// Connection id to run the tool against
    #[arg(long, value_name = "ID")]
    pub connection: String,

    /// Organization of the caller
    #[arg(long, value_name = "ORG")]
    pub org: String,

    /// Namespace chosen by the router (defaults to the connection's provider)
    #[arg(long, value_name = "NAMESPACE")]
    pub target: Option<String>,

    /// Tool arguments as a JSON document
    #[arg(long, value_name = "JSON")]
    pub arguments: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a namespaced tool name
    Parse {
        /// Raw tool name, e.g. notion__getTasks
        tool: String,

        /// Provider, to also accept the legacy <provider>_<tool> form
        #[arg(long, value_name = "PROVIDER")]
        provider: Option<String>,
    },

    /// Run the isolation checks for a tool call without executing it
    Check {
        /// Raw tool name
        tool: String,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Execute a tool call through the full isolation and resilience pipeline
    Call {
        /// Raw tool name
        tool: String,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// List the connections an organization owns
    Connections {
        /// JSON file holding connection records (defaults to store.connections_file)
        #[arg(long, value_name = "FILE")]
        connections: Option<PathBuf>,

        /// Organization to list
        #[arg(long, value_name = "ORG")]
        org: String,
    },

    /// Show configuration sources and the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_command() {
        let cli = Cli::parse_from([
            "toolgate",
            "check",
            "notion__getTasks",
            "--connection",
            "conn-1",
            "--org",
            "org-a",
            "--target",
            "notion",
            "-o",
            "json",
            "-vv",
        ]);

        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Check { tool, connection } => {
                assert_eq!(tool, "notion__getTasks");
                assert_eq!(connection.connection, "conn-1");
                assert_eq!(connection.org, "org-a");
                assert_eq!(connection.target.as_deref(), Some("notion"));
                assert!(connection.connections.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_command_defaults() {
        let cli = Cli::parse_from(["toolgate", "parse", "linear__createIssue"]);
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(matches!(cli.command, Command::Parse { provider: None, .. }));
    }
}
