//! Hnef-Rust: Hnefatafl with a Monte Carlo Tree Search player.
//!
//! ## Usage
//!
//! - `hnef-rust` - Show a demo
//! - `hnef-rust protocol` - Start the text protocol server
//! - `hnef-rust selfplay` - Play a full game between two planners

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use hnef_rust::board::Player;
use hnef_rust::constants::{MAX_PLAYOUT_LEN, N_SIMS, PLAYOUT_LEN};
use hnef_rust::mcts::{Mcts, MctsConfig};
use hnef_rust::position::{Position, Variant};
use hnef_rust::priors::{HeuristicPrior, PriorPolicy, UniformPrior};
use hnef_rust::protocol::ProtocolEngine;

/// Hnef-Rust: Hnefatafl with a Monte Carlo Tree Search player
#[derive(Parser)]
#[command(name = "hnef-rust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Rule set: historical, copenhagen or mini
    #[arg(long, global = true, default_value = "historical")]
    variant: String,

    /// Planning passes per move
    #[arg(long, global = true, default_value_t = N_SIMS)]
    sims: usize,

    /// Seed for exploration noise and playouts
    #[arg(long, global = true, default_value_t = 0)]
    seed: u64,

    /// Random playout horizon for leaf evaluation (0 disables playouts)
    #[arg(long, global = true, default_value_t = PLAYOUT_LEN)]
    playout_len: usize,

    /// Prior policy for new edges
    #[arg(long, global = true, value_enum, default_value_t = PriorKind::Uniform)]
    prior: PriorKind,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the text protocol server for use with GUIs and scripts
    Protocol,
    /// Run a single search from the opening position
    Demo,
    /// Play a full game between two planners
    Selfplay {
        /// Stop after this many plies
        #[arg(long, default_value_t = 300)]
        max_plies: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorKind {
    Uniform,
    Heuristic,
}

impl PriorKind {
    fn build(self) -> Box<dyn PriorPolicy> {
        match self {
            PriorKind::Uniform => Box::new(UniformPrior),
            PriorKind::Heuristic => Box::new(HeuristicPrior),
        }
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let variant: Variant = cli.variant.parse()?;
    if cli.playout_len > MAX_PLAYOUT_LEN {
        bail!("--playout-len must be at most {MAX_PLAYOUT_LEN}");
    }
    let config = MctsConfig {
        seed: cli.seed,
        playout_len: cli.playout_len,
        ..MctsConfig::with_simulations(cli.sims)
    };

    match cli.command {
        Some(Commands::Protocol) => {
            let mut engine = ProtocolEngine::new(variant, config, cli.prior.build());
            engine.run()
        }
        Some(Commands::Selfplay { max_plies }) => selfplay(variant, config, cli.prior, max_plies),
        Some(Commands::Demo) | None => {
            run_demo(variant, config, cli.prior);
            Ok(())
        }
    }
}

fn run_demo(variant: Variant, config: MctsConfig, prior: PriorKind) {
    println!("Hnef-Rust: Hnefatafl MCTS Engine\n");

    let pos = Position::new(variant);
    println!("{pos}\n");

    let mut mcts = Mcts::with_prior(config, prior.build());
    println!("Running {} MCTS passes...", mcts.config().num_simulations);
    let summary = mcts.think(&pos);

    match summary.best_move {
        Some(action) => println!("Best move: {}", action.to_text(pos.size())),
        None => println!("No legal moves"),
    }
    println!(
        "Tree size: {} positions, {} repeated and {} aborted passes",
        summary.tree_size, summary.repeated, summary.aborted
    );

    let mut visits = summary.visits.clone();
    visits.sort_by(|a, b| b.1.cmp(&a.1));
    for (action, n) in visits.iter().take(5) {
        println!("  {} visits={n}", action.to_text(pos.size()));
    }
}

fn selfplay(variant: Variant, config: MctsConfig, prior: PriorKind, max_plies: u32) -> Result<()> {
    let mut pos = Position::new(variant);
    let mut attacker = Mcts::with_prior(config.clone(), prior.build());
    let mut defender = Mcts::with_prior(
        MctsConfig {
            seed: config.seed.wrapping_add(1),
            ..config
        },
        prior.build(),
    );

    while !pos.done && pos.move_count < max_plies {
        let mcts = match pos.turn() {
            Player::Attacker => &mut attacker,
            Player::Defender => &mut defender,
        };
        let summary = mcts.think(&pos);
        let Some(action) = summary.best_move else {
            info!(side = %pos.turn(), "no legal moves");
            break;
        };
        let captured = pos.apply_move(action)?;
        info!(
            ply = pos.move_count,
            action = %action.to_text(pos.size()),
            captured = captured.len(),
            "move played"
        );
    }

    println!("{pos}");
    match pos.winner() {
        Some(winner) => println!("{winner} wins after {} plies", pos.move_count),
        None => println!("No result after {} plies", pos.move_count),
    }
    Ok(())
}
