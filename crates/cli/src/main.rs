mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Signal kinds accepted by `herald select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SignalKind {
    NewSession,
    CampaignsLoaded,
    CampaignsRefreshed,
    Event,
    AttributeChanged,
}

/// Herald campaign targeting tools.
#[derive(Parser)]
#[command(name = "herald", version, about = "Herald campaign targeting tools")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a targeting rule and print its tree
    Parse {
        /// Rule source, e.g. '(= `c.plan` "pro")'
        rule: String,
    },

    /// Evaluate a targeting rule
    Eval {
        /// Rule source
        rule: String,
        /// JSON object mapping variable names to values
        #[arg(long)]
        vars: Option<PathBuf>,
    },

    /// Select the campaign to display for a signal
    Select {
        /// Campaign set definition (JSON)
        #[arg(long)]
        campaigns: PathBuf,
        /// Signal to process
        #[arg(long, value_enum)]
        signal: SignalKind,
        /// Event name (required for --signal event)
        #[arg(long)]
        event: Option<String>,
        /// Event label
        #[arg(long)]
        label: Option<String>,
        /// Event attributes as a JSON object
        #[arg(long)]
        attrs: Option<String>,
        /// User attributes and tags (JSON)
        #[arg(long)]
        user: Option<PathBuf>,
        /// Engine configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Track a view of the selected campaign
        #[arg(long)]
        record: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Parse { rule } => {
            commands::parse::cmd_parse(&rule, cli.output, cli.quiet);
        }
        Commands::Eval { rule, vars } => {
            commands::eval::cmd_eval(&rule, vars.as_deref(), cli.output, cli.quiet);
        }
        Commands::Select {
            campaigns,
            signal,
            event,
            label,
            attrs,
            user,
            config,
            record,
        } => {
            let args = commands::select::SelectArgs {
                campaigns,
                signal,
                event,
                label,
                attrs,
                user,
                config,
                record,
            };
            commands::select::cmd_select(args, cli.output, cli.quiet);
        }
    }
}

/// Logs go to stderr, filtered by `HERALD_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("HERALD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
