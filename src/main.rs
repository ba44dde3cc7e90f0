//! Neuro Arcade entry point
//!
//! Parses the command line, builds the simulation context and runs the
//! evolutionary loop for the chosen game. Type `q` + Enter to stop early.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use neuro_arcade::config::Activation;
use neuro_arcade::controller::{ControllerFactory, FeedForwardFactory};
use neuro_arcade::evolution::{Evaluator, FlappyEvaluator, Population, PongEvaluator};
use neuro_arcade::render::{NullRenderer, RenderSink, TextRenderer};
use neuro_arcade::sim::{FLAPPY_INPUTS, PONG_INPUTS};
use neuro_arcade::{AbortFlag, HallOfFame, RunError, SimulationContext, TrainingConfig};

/// Exit status for an operator abort (128 + SIGINT)
const EXIT_ABORTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    game: Game,

    /// JSON training config (defaults apply to missing fields)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the number of generations
    #[arg(long, global = true)]
    generations: Option<usize>,

    /// Override the population size
    #[arg(long, global = true)]
    population: Option<usize>,

    /// Override the run seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Draw episodes in the terminal at game speed
    #[arg(long, global = true)]
    render: bool,

    /// Hall of fame file: saved champions seed the first generation and the
    /// updated leaderboard is written back at the end
    #[arg(long, global = true)]
    champions: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Game {
    /// Side-scrolling pipe dodger, whole population per episode
    Flappy,
    /// Right paddle against the opponent policy, one genome per episode
    Pong,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => {}
        Err(e) if matches!(e.downcast_ref::<RunError>(), Some(RunError::Aborted(_))) => {
            log::warn!("{}", e);
            std::process::exit(EXIT_ABORTED);
        }
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => TrainingConfig::load(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(generations) = args.generations {
        config.generations = generations;
    }
    if let Some(population) = args.population {
        config.population_size = population;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut ctx = SimulationContext::init(config).context("invalid training config")?;
    spawn_abort_listener(ctx.abort.clone());

    let sink: Box<dyn RenderSink> = if args.render {
        Box::new(TextRenderer::stdout())
    } else {
        Box::new(NullRenderer)
    };
    let (factory, mut evaluator): (FeedForwardFactory, Box<dyn Evaluator>) = match args.game {
        Game::Flappy => {
            let factory = FeedForwardFactory::new(FLAPPY_INPUTS, 1, Activation::Sigmoid);
            (factory, Box::new(FlappyEvaluator::new(factory, sink)) as Box<dyn Evaluator>)
        }
        Game::Pong => {
            let factory = FeedForwardFactory::new(PONG_INPUTS, 1, Activation::Tanh);
            (factory, Box::new(PongEvaluator::new(factory, sink)) as Box<dyn Evaluator>)
        }
    };
    log::info!("Training {:?}", args.game);

    let mut hall = match &args.champions {
        Some(path) => HallOfFame::load(path)
            .with_context(|| format!("failed to load champions from {}", path.display()))?,
        None => HallOfFame::new(),
    };

    let genome_len = factory.genome_len(&ctx.config.topology);
    let mut population = Population::from_config(&ctx.config, genome_len);
    let seeded = population.seed_with(hall.entries.iter().map(|c| &c.genome));
    if seeded > 0 {
        log::info!("Seeded {} genomes from the hall of fame", seeded);
    }

    let history = population.run(evaluator.as_mut(), &mut ctx, &mut hall)?;
    if let Some(last) = history.last() {
        log::info!(
            "Finished: best {:.2}, mean {:.2} in generation {}",
            last.best,
            last.mean,
            last.generation
        );
    }
    if let Some(champion) = hall.top() {
        log::info!(
            "Champion {} scored {:.2} in generation {}",
            champion.genome.id,
            champion.fitness,
            champion.generation
        );
    }

    if let Some(path) = &args.champions {
        hall.save(path)
            .with_context(|| format!("failed to save champions to {}", path.display()))?;
    }
    ctx.shutdown();
    Ok(())
}

/// Request an abort when the operator types `q` on stdin
fn spawn_abort_listener(abort: AbortFlag) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("q") {
                log::info!("Abort requested");
                abort.request();
                break;
            }
        }
    });
}
