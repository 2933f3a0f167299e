//! Main entry point for the versus-rank service
//!
//! Runs the ranking service until a shutdown signal arrives, or drives a
//! seeded simulation of voters against synthetic contestants and prints the
//! resulting leaderboard.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, error, info, warn};
use versus_rank::config::AppConfig;
use versus_rank::matchmaking::{MatchRequest, RngSource};
use versus_rank::ranking::{Leaderboard, SortKey};
use versus_rank::service::AppState;
use versus_rank::types::{BattleOutcome, Category, ContestantId};

/// Versus Rank - pairwise battle ranking service
#[derive(Parser)]
#[command(
    name = "versus-rank",
    version,
    about = "Elo ranking of contestants across six categories from head-to-head votes",
    long_about = "Versus Rank resolves head-to-head votes with a dynamic K-factor Elo update, \
                 pairs contestants of similar strength, and periodically re-anchors each \
                 category's mean score."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,

    /// Simulate this many battles and exit
    #[arg(long, value_name = "N", help = "Run a simulation of N battles and exit")]
    simulate: Option<u64>,

    /// Concurrent simulated voters
    #[arg(long, value_name = "W", default_value_t = 4)]
    workers: usize,

    /// Synthetic contestants in the simulation
    #[arg(long, value_name = "C", default_value_t = 24)]
    contestants: usize,

    /// Seed for the simulation
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print the final leaderboard as JSON
    #[arg(long)]
    json: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Versus Rank {}", versus_rank::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   K-factor: {} below {} games, {} after",
        config.rating.k_high, config.rating.k_threshold_games, config.rating.k_low
    );
    info!(
        "   Rival matches: {:.0}% within {} points",
        config.matchmaking.rival_match_probability * 100.0,
        config.matchmaking.rival_score_window
    );
    info!(
        "   Anchor: {} (damping {}, every {}s / {} battles)",
        config.normalization.anchor,
        config.normalization.damping,
        config.normalization.interval_seconds,
        config.normalization.every_n_battles
    );
}

/// Load configuration and apply CLI overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    versus_rank::config::validate_config(&config)?;
    Ok(config)
}

/// Hidden per-category strength of a synthetic contestant
struct SyntheticContestant {
    id: ContestantId,
    quality: [f64; Category::COUNT],
}

impl SyntheticContestant {
    fn quality(&self, category: Category) -> f64 {
        self.quality[category.index()]
    }
}

/// Probability that a voter prefers `a` over `b`
fn preference(a: f64, b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((b - a) / 400.0))
}

fn seed_contestants(
    state: &AppState,
    count: usize,
    rng: &mut StdRng,
) -> Result<Vec<SyntheticContestant>> {
    (0..count)
        .map(|i| {
            let contestant = state.add_contestant(&format!("Contestant {:03}", i + 1))?;
            let mut quality = [0.0; Category::COUNT];
            for q in quality.iter_mut() {
                *q = rng.gen_range(800.0..1600.0);
            }
            Ok(SyntheticContestant {
                id: contestant.id,
                quality,
            })
        })
        .collect()
}

/// Vote on `battles` matchups, favoring the contestant with higher hidden quality
async fn run_voter(
    state: Arc<AppState>,
    population: Arc<Vec<SyntheticContestant>>,
    battles: u64,
    seed: u64,
) -> Result<u64> {
    let mut rng = RngSource::seeded(seed);
    let mut voter = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut resolved = 0;
    let mut last_winner = None;

    for _ in 0..battles {
        let request = MatchRequest {
            exclude: last_winner,
            ..Default::default()
        };
        let matchup = state.next_matchup_with(&request, &mut rng)?;
        let (first, second) = matchup.ids();

        let quality = |id: ContestantId| {
            population
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.quality(matchup.category))
                .unwrap_or_default()
        };
        let p_first = preference(quality(first), quality(second));
        let (winner, loser) = if voter.gen::<f64>() < p_first {
            (first, second)
        } else {
            (second, first)
        };

        let outcome = BattleOutcome {
            category: matchup.category,
            winner,
            loser,
        };
        match state.record_vote(&outcome).await {
            Ok(_) => resolved += 1,
            Err(e) if e.is_conflict() => warn!("Vote dropped after conflict: {}", e),
            Err(e) => return Err(e.into()),
        }
        last_winner = Some(winner);
    }

    Ok(resolved)
}

async fn run_simulation(config: AppConfig, args: &Args, battles: u64) -> Result<()> {
    let workers = args.workers.max(1);
    info!(
        "Simulating {} battles across {} workers over {} contestants (seed {})",
        battles, workers, args.contestants, args.seed
    );

    let mut state = AppState::new(config)?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let population = Arc::new(seed_contestants(&state, args.contestants, &mut rng)?);
    state.start().await?;

    let state = Arc::new(state);
    let per_worker = battles / workers as u64;
    let remainder = battles % workers as u64;

    let handles: Vec<_> = (0..workers)
        .map(|w| {
            let share = per_worker + u64::from((w as u64) < remainder);
            let seed = args.seed.wrapping_add(1000 * (w as u64 + 1));
            tokio::spawn(run_voter(state.clone(), population.clone(), share, seed))
        })
        .collect();

    let mut resolved = 0;
    for handle in handles {
        resolved += handle.await.context("Voter task failed")??;
    }
    info!("Resolved {} of {} battles", resolved, battles);

    let report = state.normalize_now()?;
    debug!("Final normalization: {:?}", report);

    let board = state.leaderboard(SortKey::Overall)?;
    print_leaderboard(&board, args.json)?;
    println!("{}", state.metrics().render()?);

    match Arc::try_unwrap(state) {
        Ok(mut state) => state.stop().await?,
        Err(_) => warn!("Service still shared at exit, skipping graceful stop"),
    }

    Ok(())
}

fn print_leaderboard(board: &Leaderboard, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(board)?);
        return Ok(());
    }

    println!("Leaderboard ({})", board.sort_key);
    println!("{:>4}  {:<20} {:>9} {:>6}", "#", "Name", "Score", "Games");
    for standing in &board.standings {
        println!(
            "{:>4}  {:<20} {:>9.1} {:>6}",
            standing.position, standing.name, standing.score, standing.total_games
        );
    }
    Ok(())
}

async fn run_service(config: AppConfig) -> Result<()> {
    let mut app_state = AppState::new(config)?;
    app_state.start().await?;

    info!("Versus Rank service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("Shutdown signal received, beginning graceful shutdown...");
    if let Err(e) = app_state.stop().await {
        warn!("Shutdown did not complete cleanly: {}", e);
    }

    info!("Versus Rank service stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    let result = match args.simulate {
        Some(battles) => run_simulation(config, &args, battles).await,
        None => run_service(config).await,
    };

    if let Err(e) = &result {
        error!("Fatal error: {:#}", e);
    }
    result
}
