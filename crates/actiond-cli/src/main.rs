mod cmd;
mod config_path;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "actiond",
    about = "Run a named action against every matching object",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest actiond.yaml, else built-in defaults)
    #[arg(long, global = true, env = "ACTIOND_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP actions endpoint
    Serve {
        /// Address to listen on (overrides `listen` in the config)
        #[arg(long)]
        listen: Option<String>,
    },

    /// List registered actions and the object types they apply to
    Actions,

    /// Run one action in-process against the configured objects and print
    /// the result envelope
    Invoke {
        /// Action name
        action: String,

        /// Request parameter; repeat a key to pass an array
        #[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Include diagnostic detail in failures
        #[arg(long)]
        verbose: bool,
    },

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = config_path::load_config(cli.config.as_deref()).and_then(|config| {
        match cli.command {
            Commands::Serve { listen } => cmd::serve::run(&config, listen.as_deref()),
            Commands::Actions => cmd::actions::run(cli.json),
            Commands::Invoke {
                action,
                params,
                verbose,
            } => cmd::invoke::run(&config, &action, &params, verbose),
            Commands::Config { subcommand } => cmd::config::run(&config, subcommand, cli.json),
        }
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
