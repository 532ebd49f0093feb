use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xingxing_core::CoreError;

mod commands;

#[derive(Parser)]
#[command(name = "xingxing", version, about = "Xingxing habit and health tracker CLI")]
struct Cli {
    /// Calendar day to act on (YYYY-MM-DD); defaults to the local date
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit task management and completion
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Point balance and ledger
    Points {
        #[command(subcommand)]
        action: commands::points::PointsAction,
    },
    /// Medication dosing and interval checks
    Med {
        #[command(subcommand)]
        action: commands::med::MedAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("XINGXING_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    tracing::debug!(%today, "acting on calendar day");

    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action, today),
        Commands::Points { action } => commands::points::run(action),
        Commands::Med { action } => commands::med::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "xingxing", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        // Duplicate clicks and the like are no-ops, not failures.
        if e.downcast_ref::<CoreError>().is_some_and(CoreError::is_recoverable) {
            eprintln!("notice: {e}");
            std::process::exit(2);
        }
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
