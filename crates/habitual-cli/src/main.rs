use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "habitual", version, about = "Habit tracker with time slot suggestions")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit management
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Local calendar events
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Suggest free time slots for a habit
    Suggest(commands::suggest::SuggestArgs),
    /// Streaks and completion statistics
    Progress(commands::progress::ProgressArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// `HABITUAL_LOG` takes precedence; otherwise warnings only, or debug with
/// `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("HABITUAL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Habit { action } => commands::habit::run(action),
        Commands::Event { action } => commands::event::run(action),
        Commands::Suggest(args) => commands::suggest::run(args),
        Commands::Progress(args) => commands::progress::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
