//! Binary entrypoint for the kwamirpg maintenance CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and export editable seed files
//! - `status` - print store statistics
//! - `show-player --user <id>` - dump one player document as JSON
//! - `sweep-combat` - clear orphaned `in_combat` flags
//! - `decay-luck` - apply the nightly luck decay to all players
//! - `expire-quests` - remove expired daily/weekly quests
//!
//! The chat gateway runs elsewhere; this binary is operational tooling only.

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use kwamirpg::config::Config;
use kwamirpg::rpg::RpgEngine;

#[derive(Parser)]
#[command(name = "kwamirpg")]
#[command(about = "Maintenance tooling for the kwamirpg engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file and export seed catalogs
    Init,
    /// Show store statistics
    Status,
    /// Print one player document as JSON
    ShowPlayer {
        /// Player user id
        #[arg(short, long)]
        user: String,
    },
    /// Clear in_combat flags left behind by abandoned sessions
    SweepCombat,
    /// Apply the nightly luck decay to every player
    DecayLuck,
    /// Remove expired daily and weekly quests
    ExpireQuests,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init => {
            let config = Config::create_default(&cli.config).await?;
            info!("configuration file created at {}", cli.config);
            let seeds_dir = format!("{}/seeds", config.storage.data_dir);
            kwamirpg::rpg::seed_loader::export_defaults(&seeds_dir)?;
            info!("seed catalogs exported to {seeds_dir}");
        }
        Commands::Status => {
            let config = Config::load(&cli.config).await?;
            let data_dir = config.storage.data_dir.clone();
            let engine = RpgEngine::open(config)?;
            println!("data dir: {data_dir}");
            println!("players:  {}", engine.player_count()?);
        }
        Commands::ShowPlayer { user } => {
            let config = Config::load(&cli.config).await?;
            let engine = RpgEngine::open(config)?;
            let player = engine.snapshot(&user)?;
            println!("{}", serde_json::to_string_pretty(&player)?);
        }
        Commands::SweepCombat => {
            let config = Config::load(&cli.config).await?;
            let engine = RpgEngine::open(config)?;
            let cleared = engine.sweep_stale_combat().await?;
            info!("cleared {cleared} orphaned combat flags");
        }
        Commands::DecayLuck => {
            let config = Config::load(&cli.config).await?;
            let engine = RpgEngine::open(config)?;
            let changed = engine.decay_luck_daily().await?;
            info!("decayed luck for {changed} players");
        }
        Commands::ExpireQuests => {
            let config = Config::load(&cli.config).await?;
            let engine = RpgEngine::open(config)?;
            let removed = engine.expire_quests().await?;
            info!("removed {removed} expired quests");
        }
    }

    Ok(())
}

fn init_logging(verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);
    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "{} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}
