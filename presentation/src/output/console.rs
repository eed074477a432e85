//! Console output formatter for isolation and resilience reports

use colored::Colorize;
use serde::Serialize;
use toolgate_application::{BreakerSnapshot, CircuitState, IsolationParams, PoolStats};
use toolgate_domain::{Connection, IsolatedToolCall, IsolationError, ParsedToolName};

/// Formats command results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format any serializable report as JSON
    pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn format_parsed(raw_name: &str, parsed: &ParsedToolName) -> String {
        let mut output = Self::header("Tool Name");
        output.push('\n');
        output.push_str(&Self::field("Raw", raw_name));
        output.push_str(&Self::field(
            "Namespace",
            parsed.namespace().unwrap_or("(none)"),
        ));
        output.push_str(&Self::field("Tool", &parsed.tool_name));
        if parsed.is_legacy {
            output.push_str(&Self::field("Format", &"legacy".yellow().to_string()));
        }
        output
    }

    pub fn format_call(call: &IsolatedToolCall) -> String {
        let mut output = format!("{} {}\n", "ALLOWED".green().bold(), call.resolved_tool_name);
        output.push_str(&Self::field("Namespace", &call.namespace));
        output.push_str(&Self::field("Provider", &call.provider));
        output.push_str(&Self::field("Connection", call.connection_id.as_str()));
        output.push_str(&Self::field("Organization", call.organization_id.as_str()));
        if call.is_legacy {
            output.push_str(&Self::field("Format", &"legacy".yellow().to_string()));
        }
        if let Some(arguments) = &call.resolved_arguments {
            output.push_str(&format!("  {}\n{}\n", "Arguments:".cyan(), Self::indent(&Self::format_json(arguments), "    ")));
        }
        output
    }

    pub fn format_isolation_error(error: &IsolationError) -> String {
        let label = if error.is_security_violation() {
            "SECURITY VIOLATION".red().bold()
        } else {
            "BLOCKED".yellow().bold()
        };
        let mut output = format!("{} {}\n", label, error.violation());
        for (key, value) in error.audit_fields() {
            output.push_str(&Self::field(key, value));
        }
        output
    }

    /// JSON rendering of an isolation failure, with audit fields as an object
    pub fn isolation_error_json(error: &IsolationError) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = error
            .audit_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        serde_json::json!({
            "allowed": false,
            "violation": error.violation().as_str(),
            "security_violation": error.is_security_violation(),
            "message": error.to_string(),
            "audit": fields,
        })
    }

    pub fn format_connections(organization: &str, connections: &[Connection]) -> String {
        let mut output = Self::header(&format!("Connections of {organization}"));
        output.push('\n');
        if connections.is_empty() {
            output.push_str("  (none)\n");
        }
        for connection in connections {
            let status = if connection.is_enabled() {
                "enabled".green()
            } else {
                "disabled".red()
            };
            let kind = connection.credentials().map(|c| c.kind()).unwrap_or("none");
            output.push_str(&format!(
                "  {:<24} {:<12} {:<10} {:<8} {}\n",
                connection.id().as_str(),
                connection.namespace(),
                status,
                kind,
                connection.display_name()
            ));
        }
        output
    }

    /// JSON listing of connections; credential material is never included
    pub fn connections_json(connections: &[Connection]) -> serde_json::Value {
        connections
            .iter()
            .map(|connection| {
                serde_json::json!({
                    "id": connection.id().as_str(),
                    "organization_id": connection.organization_id().as_str(),
                    "provider": connection.provider(),
                    "namespace": connection.namespace(),
                    "display_name": connection.display_name(),
                    "enabled": connection.is_enabled(),
                    "credentials": connection.credentials().map(|c| c.kind()),
                    "expires_at": connection.credentials().and_then(|c| c.expires_at()),
                })
            })
            .collect()
    }

    pub fn format_params(params: &IsolationParams) -> String {
        let mut output = Self::section_header("Circuit Breaker");
        let breaker = &params.breaker;
        output.push_str(&Self::field("Scope", params.breaker_scope.as_str()));
        output.push_str(&Self::field("Failure threshold", &breaker.failure_threshold.to_string()));
        output.push_str(&Self::field("Success threshold", &breaker.success_threshold.to_string()));
        output.push_str(&Self::field("Reset timeout", &format!("{}s", breaker.reset_timeout.as_secs())));
        output.push_str(&Self::field(
            "Call timeout",
            &breaker
                .call_timeout
                .map(|t| format!("{}s", t.as_secs()))
                .unwrap_or_else(|| "none".to_string()),
        ));
        output.push_str(&Self::field("Half-open trials", &breaker.half_open_max_calls.to_string()));

        let mut overrides: Vec<_> = params.breaker_overrides.iter().collect();
        overrides.sort_by(|a, b| a.0.cmp(b.0));
        for (provider, over) in overrides {
            output.push_str(&format!(
                "  {} failure_threshold={} success_threshold={} reset_timeout={}s\n",
                format!("[{provider}]").yellow(),
                over.failure_threshold,
                over.success_threshold,
                over.reset_timeout.as_secs()
            ));
        }

        output.push_str(&Self::section_header("Client Pool"));
        output.push_str(&Self::field("Idle timeout", &format!("{}s", params.pool.idle_timeout.as_secs())));
        output.push_str(&Self::field("Reap interval", &format!("{}s", params.pool.reap_interval.as_secs())));

        output.push_str(&Self::section_header("Token Refresh"));
        output.push_str(&Self::field("Safety skew", &format!("{}s", params.token.safety_skew.as_secs())));
        output.push_str(&Self::field("Single flight", &params.token.single_flight.to_string()));
        output
    }

    pub fn format_breakers(snapshots: &[BreakerSnapshot]) -> String {
        let mut output = Self::section_header("Breakers");
        for snapshot in snapshots {
            let state = match snapshot.state {
                CircuitState::Closed => snapshot.state.as_str().green(),
                CircuitState::HalfOpen => snapshot.state.as_str().yellow(),
                CircuitState::Open => snapshot.state.as_str().red(),
            };
            output.push_str(&format!(
                "  {:<24} {:<10} failures={} opened={}\n",
                snapshot.name, state, snapshot.consecutive_failures, snapshot.open_count
            ));
        }
        output
    }

    pub fn format_pool_stats(stats: &PoolStats) -> String {
        format!(
            "{} entries={} in_use={} created={} reused={} evicted={} retired_on_refresh={}\n",
            "Pool:".cyan(),
            stats.entries,
            stats.in_use,
            stats.created,
            stats.reused,
            stats.evicted,
            stats.retired_on_refresh
        )
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn field(label: &str, value: &str) -> String {
        format!("  {:<14} {}\n", format!("{label}:").cyan(), value)
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
