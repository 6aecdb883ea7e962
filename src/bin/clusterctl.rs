use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use tracing_subscriber::EnvFilter;

use clusterctl::{
    ClientConfig, ConfigOverrides,
    cli_utils::{self, OutputFormat},
    commands::{CommandContext, StdinConfirm, handle_node_command},
    http_utils::ClusteringClient,
};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Options {
    #[arrrg(optional, "Base URL of the clustering service")]
    base_url: String,
    #[arrrg(optional, "Auth token sent as X-Auth-Token")]
    token: String,
    #[arrrg(optional, "Project ID sent as X-Project-Id")]
    project: String,
    #[arrrg(optional, "Request timeout in seconds")]
    timeout: String,
    #[arrrg(optional, "Output format: table, json or yaml (default: table)")]
    output: OutputFormat,
    #[arrrg(flag, "Enable verbose logging")]
    verbose: bool,
}

const USAGE: &str = r#"Usage: clusterctl [options] <command> [args...]

Options:
  --base-url <url>     Base URL of the clustering service (default: http://localhost:8778, env: CLUSTERCTL_URL)
  --token <token>      Auth token sent as X-Auth-Token (env: CLUSTERCTL_TOKEN)
  --project <id>       Project ID sent as X-Project-Id (env: CLUSTERCTL_PROJECT)
  --timeout <secs>     Request timeout in seconds (env: CLUSTERCTL_TIMEOUT)
  --output <format>    Output format: table, json or yaml (default: table)
  --verbose            Enable verbose logging

Commands:
  node list [--cluster <c>] [--global-project] [--marker <id>] [--limit <n>]
            [--sort <key:dir>] [--filter <k=v;...>] [--full-id]
                                               List nodes
  node show [--details] <node>                 Show a node
  node create --profile <p> [--cluster <c>] [--role <r>] [--metadata <k=v;...>] <name>
                                               Create a node
  node update [--name <n>] [--profile <p>] [--role <r>] [--metadata <k=v;...>] <node>
                                               Update a node
  node delete [--force] <node> [<node>...]     Delete nodes
  node check <node> [<node>...]                Check node health
  node recover [--check] <node> [<node>...]    Recover nodes"#;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (options, free) =
        Options::from_command_line_relaxed("USAGE: clusterctl [options] <command> [args...]");

    init_logging(options.verbose);

    if free.is_empty() {
        cli_utils::exit_with_usage_error("No command specified", USAGE);
    }
    if free[0] == "help" {
        println!("{}", USAGE);
        return Ok(());
    }

    let overrides = ConfigOverrides {
        base_url: options.base_url,
        token: options.token,
        project: options.project,
        timeout: options.timeout,
    };
    let config = ClientConfig::from_overrides(&overrides)
        .unwrap_or_else(|e| cli_utils::exit_with_cli_error(&e));
    tracing::debug!(base_url = %config.base_url, "using clustering service");

    let client =
        ClusteringClient::new(&config).unwrap_or_else(|e| cli_utils::exit_with_cli_error(&e));
    let confirm = StdinConfirm;
    let context = CommandContext::new(&client, &confirm);

    let result = match free[0].as_str() {
        "node" => handle_node_command(&free[1..], context).await,
        _ => {
            cli_utils::exit_with_error(&format!(
                "Unknown command '{}'. Available commands: node",
                free[0]
            ))
        }
    };

    match result {
        Ok(output) => cli_utils::print_output_or_exit(&output, options.output),
        Err(e) => cli_utils::exit_with_command_error(&e),
    }

    Ok(())
}
