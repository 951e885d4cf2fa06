use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "freeslot", version, about = "Free-time slot finder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Free slot computation and queries
    Slots {
        #[command(subcommand)]
        action: commands::slots::SlotsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr so JSON on stdout stays machine-readable.
/// `FREESLOT_LOG` takes an env-filter directive, e.g. `freeslot_core=debug`.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("FREESLOT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Slots { action } => commands::slots::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
