use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use research_prompts::config::{find_config_file, get_config, load_config, Config, ENV_PREFIX};
use research_prompts::mcp::McpServer;
use research_prompts::prompts::{ContextStore, PromptCatalog, PromptDefinition, PromptDispatcher};
use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Research Prompts MCP - Structured research workflow prompts for AI assistants
#[derive(Parser, Debug)]
#[command(name = "research-prompts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server providing research workflow prompts with session-scoped context", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (for Claude Desktop and other MCP clients)
    Serve {
        /// Run in HTTP mode instead of stdio
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode (default from config)
        #[arg(long, short)]
        port: Option<u16>,

        /// Host to bind to for HTTP mode (default from config)
        #[arg(long)]
        host: Option<String>,
    },

    /// Inspect and render prompts locally
    #[command(alias = "p")]
    Prompts {
        #[command(subcommand)]
        command: PromptCommands,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum PromptCommands {
    /// List available prompts and their arguments
    #[command(alias = "ls")]
    List,

    /// Render a prompt
    Get {
        /// Prompt name (e.g., "deep-paper-analysis")
        name: String,

        /// Prompt argument as key=value (repeatable)
        #[arg(long = "arg", short = 'a', value_parser = parse_key_val)]
        args: Vec<(String, String)>,

        /// Session id for the research context
        #[arg(long, short)]
        session: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,

    /// Print the default config file location
    Path,
}

/// Parse a `key=value` pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value: no '=' found in '{}'", s))?;
    if key.is_empty() {
        return Err(format!("invalid key=value: empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Print all available environment variables
fn print_env_vars() {
    println!("Research Prompts MCP - Environment Variables");
    println!();
    println!("Server:");
    println!("  {}_SERVER__NAME      Server name reported to clients (default: research-prompts)", ENV_PREFIX);
    println!("  {}_SERVER__HOST      Host for HTTP mode (default: 127.0.0.1)", ENV_PREFIX);
    println!("  {}_SERVER__PORT      Port for HTTP mode (default: 3000)", ENV_PREFIX);
    println!();
    println!("Prompts:");
    println!("  {}_PROMPTS__DEFAULT_EXPERTISE_LEVEL  Expertise level of new sessions (default: intermediate)", ENV_PREFIX);
    println!("  {}_PROMPTS__REQUIRE_SESSION_ID       Reject prompt calls without a session id (default: false)", ENV_PREFIX);
    println!("  {}_PROMPTS__MAX_SESSIONS             Session contexts held at once, 0 = unlimited (default: 1024)", ENV_PREFIX);
    println!("  {}_PROMPTS__SESSION_IDLE_TIMEOUT_SECS  Drop session contexts idle this long, 0 = never (default: 3600)", ENV_PREFIX);
    println!();
    println!("Logging:");
    println!("  {}_LOGGING__LEVEL    Default log level (default: info)", ENV_PREFIX);
    println!("  {}_LOGGING__FORMAT   Log format: text or json (default: text)", ENV_PREFIX);
    println!("  RUST_LOG                           Overrides all other log settings");
    println!();
    println!("Example:");
    println!("  export {}_PROMPTS__REQUIRE_SESSION_ID=true", ENV_PREFIX);
    std::process::exit(0);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
    }

    // Load configuration from file if specified or found in default locations
    let config = if let Some(config_path) = &cli.config {
        load_config(config_path)?
    } else if let Some(config_path) = find_config_file() {
        load_config(&config_path)?
    } else {
        get_config()?
    };

    // Initialize tracing based on verbosity; logs go to stderr so stdio
    // transport output stays clean
    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    let json = config.logging.is_json();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("research_prompts={}", env_filter)),
        ))
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let dispatcher = Arc::new(build_dispatcher(&config));

    match cli.command {
        Some(Commands::Serve { http, port, host }) => {
            let server = McpServer::with_name(&config.server.name, dispatcher)?;

            if http {
                let addr = format!(
                    "{}:{}",
                    host.unwrap_or(config.server.host),
                    port.unwrap_or(config.server.port)
                );
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                handle
                    .await
                    .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
            } else {
                server.run().await?;
            }
        }

        Some(Commands::Prompts { command }) => match command {
            PromptCommands::List => {
                output_prompts(dispatcher.list_prompts(), cli.output);
            }
            PromptCommands::Get {
                name,
                args,
                session,
            } => {
                let arguments: HashMap<String, String> = args.into_iter().collect();
                let rendered = dispatcher
                    .get_prompt(&name, Some(&arguments), session.as_deref())
                    .await?;

                match cli.output.resolve() {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&rendered)?);
                    }
                    _ => println!("{}", rendered.text()),
                }
            }
        },

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => {
                print!("{}", config.to_toml()?);
            }
            ConfigCommands::Path => {
                let path = research_prompts::config::default_config_path()
                    .context("Could not determine the config directory")?;
                println!("{}", path.display());
            }
        },

        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

fn build_dispatcher(config: &Config) -> PromptDispatcher {
    let store = ContextStore::with_default_expertise(config.prompts.default_expertise_level.clone())
        .with_limits(config.prompts.session_limits());
    PromptDispatcher::new(PromptCatalog::new(), store)
        .require_session_id(config.prompts.require_session_id)
}

fn output_prompts(prompts: &[PromptDefinition], format: OutputFormat) {
    match format.resolve() {
        OutputFormat::Json => match serde_json::to_string_pretty(prompts) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize prompts: {}", e),
        },
        OutputFormat::Plain => {
            for prompt in prompts {
                println!("{} - {}", prompt.name, prompt.description);
                for arg in &prompt.arguments {
                    let marker = if arg.required { "required" } else { "optional" };
                    println!("  {} ({}): {}", arg.name, marker, arg.description);
                }
                println!();
            }
        }
        OutputFormat::Table | OutputFormat::Auto => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Prompt", "Required", "Optional", "Description"]);

            for prompt in prompts {
                let names = |required: bool| {
                    prompt
                        .arguments
                        .iter()
                        .filter(|a| a.required == required)
                        .map(|a| a.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                };

                table.add_row(vec![
                    Cell::new(&prompt.name).add_attribute(Attribute::Bold),
                    Cell::new(names(true)),
                    Cell::new(names(false)),
                    Cell::new(&prompt.description),
                ]);
            }
            println!("{table}");
        }
    }
}
