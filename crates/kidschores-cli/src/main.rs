use clap::{Parser, Subcommand};
use std::io;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "kidschores-cli", version, about = "KidsChores CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Kid management
    Kid {
        #[command(subcommand)]
        action: commands::kid::KidAction,
    },
    /// Parent management
    Parent {
        #[command(subcommand)]
        action: commands::kid::ParentAction,
    },
    /// Chore definitions and lifecycle
    Chore {
        #[command(subcommand)]
        action: commands::chore::ChoreAction,
    },
    /// Rewards and redemption
    Reward {
        #[command(subcommand)]
        action: commands::reward::RewardAction,
    },
    /// Badge definitions
    Badge {
        #[command(subcommand)]
        action: commands::gamification::BadgeAction,
    },
    /// Achievement definitions
    Achievement {
        #[command(subcommand)]
        action: commands::gamification::AchievementAction,
    },
    /// Challenge definitions
    Challenge {
        #[command(subcommand)]
        action: commands::gamification::ChallengeAction,
    },
    /// Penalties
    Penalty {
        #[command(subcommand)]
        action: commands::adjust::PenaltyAction,
    },
    /// Bonuses
    Bonus {
        #[command(subcommand)]
        action: commands::adjust::BonusAction,
    },
    /// Manual point adjustments and ledger
    Points {
        #[command(subcommand)]
        action: commands::adjust::PointsAction,
    },
    /// Household overview
    Status,
    /// Run one scheduler pass
    Tick,
    /// Run the scheduler until Ctrl-C
    Run {
        /// Override schedule.overdue_check_interval_minutes (seconds)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Wipe every kid, chore, reward and the ledger
    ResetAllData {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("KIDSCHORES_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Kid { action } => commands::kid::run(action),
        Commands::Parent { action } => commands::kid::run_parent(action),
        Commands::Chore { action } => commands::chore::run(action),
        Commands::Reward { action } => commands::reward::run(action),
        Commands::Badge { action } => commands::gamification::run_badge(action),
        Commands::Achievement { action } => commands::gamification::run_achievement(action),
        Commands::Challenge { action } => commands::gamification::run_challenge(action),
        Commands::Penalty { action } => commands::adjust::run_penalty(action),
        Commands::Bonus { action } => commands::adjust::run_bonus(action),
        Commands::Points { action } => commands::adjust::run_points(action),
        Commands::Status => commands::admin::status(),
        Commands::Tick => commands::admin::tick(),
        Commands::Run { interval_secs } => commands::admin::run(interval_secs),
        Commands::ResetAllData { yes } => commands::admin::reset_all_data(yes),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
