//! Cogstruction CLI - Search for a cog array from the exported data tables.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;

use cogstruction::{
    compute::{
        CogArray,
        evolution::{EvolutionEngine, EvolutionResult},
    },
    io::{
        InputTables, VERSION, plan_moves, read_prior_layout, read_prior_version,
        write_layout_record, write_move_table, write_report,
    },
    schema::{CogId, FitnessKind, SearchConfig, Slot},
};

/// Optimize the distribution of cogs in the construction skill.
///
/// All arguments are optional. Flags override values from `--config`.
#[derive(Parser)]
#[command(name = "cogstruction", version, about, long_about = None)]
struct Cli {
    /// Random seed for this run (defaults to the current time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Fitness function: average_affix_conversion (aac) or inversion_matrix (im)
    #[arg(short, long)]
    function: Option<FitnessKind>,

    /// Weight of the build rate
    #[arg(long, visible_alias = "bw", alias = "build_weight")]
    build_weight: Option<f64>,

    /// Weight of the flaggy rate
    #[arg(long, visible_alias = "fw", alias = "flaggy_weight")]
    flaggy_weight: Option<f64>,

    /// Weight of the experience multiplier
    #[arg(long, visible_alias = "ew", alias = "exp_weight")]
    exp_weight: Option<f64>,

    /// Population size
    #[arg(long)]
    pop: Option<usize>,

    /// Minimum generations per restart
    #[arg(long)]
    min_gen: Option<usize>,

    /// Maximum generations per restart
    #[arg(long)]
    max_gen: Option<usize>,

    /// Number of restarts
    #[arg(long)]
    runs: Option<usize>,

    /// Search configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the cog, empties and flaggies tables
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Directory for the result files (defaults to the data directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Seed the initial population with the previous layout
    #[arg(long)]
    from_prior: bool,

    /// Print the default configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Report timing and per-restart results
    #[arg(short, long)]
    verbose: bool,

    /// Print debug messages
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn apply(&self, config: &mut SearchConfig) {
        if let Some(function) = self.function {
            config.fitness.function = function;
        }
        if let Some(w) = self.build_weight {
            config.fitness.weights.build = w;
        }
        if let Some(w) = self.flaggy_weight {
            config.fitness.weights.flaggy = w;
        }
        if let Some(w) = self.exp_weight {
            config.fitness.weights.exp = w;
        }
        if let Some(pop) = self.pop {
            config.population_size = pop;
        }
        if let Some(min) = self.min_gen {
            config.iteration.min_generations = min;
        }
        if let Some(max) = self.max_gen {
            config.iteration.max_generations = max;
        }
        if let Some(runs) = self.runs {
            config.iteration.num_restarts = runs;
        }
        if let Some(seed) = self.seed {
            config.random_seed = Some(seed);
        }
    }
}

fn exit_with(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, err);
    std::process::exit(1);
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn load_config(path: &Path) -> SearchConfig {
    let config_str = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with("Error reading config file", e));
    serde_json::from_str(&config_str).unwrap_or_else(|e| exit_with("Error parsing config", e))
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.print_config {
        print_example_config();
        return;
    }

    let mut config = match &cli.config {
        Some(path) => load_config(path),
        None => SearchConfig::default(),
    };
    cli.apply(&mut config);
    let seed = *config.random_seed.get_or_insert_with(time_seed);
    log::debug!("Seed: {}", seed);

    if let Err(e) = config.validate() {
        exit_with("Invalid configuration", e);
    }

    let output_dir = cli.output_dir.clone().unwrap_or_else(|| cli.data_dir.clone());
    fs::create_dir_all(&output_dir)
        .unwrap_or_else(|e| exit_with("Error creating output directory", e));

    let tables =
        InputTables::load(&cli.data_dir).unwrap_or_else(|e| exit_with("Error reading input", e));

    println!("{}", VERSION);
    println!("=====================");
    println!(
        "Cogs: {} ({} slots, {} flags)",
        tables.catalog.len(),
        tables.slots.len(),
        tables.flags.len()
    );
    println!("Fitness: {}", config.fitness.function.name());
    println!("Population: {}", config.population_size);
    println!(
        "Generations: {}..{} x {} restarts",
        config.iteration.min_generations,
        config.iteration.max_generations,
        config.iteration.num_restarts
    );
    println!("Seed: {}", seed);
    println!();

    // The prior record is read before anything is overwritten.
    if let Some(version) = read_prior_version(&output_dir) {
        println!("Previous report: {}", version);
    }
    let prior = read_prior_layout(&output_dir)
        .unwrap_or_else(|e| exit_with("Error reading previous layout", e))
        .unwrap_or_default();

    let catalog = Arc::new(tables.catalog);
    let slots = Arc::new(tables.slots);

    let mut engine = EvolutionEngine::new(&config, Arc::clone(&catalog), Arc::clone(&slots))
        .unwrap_or_else(|e| exit_with("Error preparing search", e));
    if cli.debug {
        engine = engine.with_standard_probes();
    }
    if cli.from_prior && !prior.is_empty() {
        let placements: Vec<(Slot, CogId)> = prior.iter().map(|r| (r.slot(), r.cog)).collect();
        match CogArray::from_placements(Arc::clone(&catalog), Arc::clone(&slots), &placements) {
            Ok(layout) => {
                engine = engine
                    .with_seed_layout(&layout)
                    .unwrap_or_else(|e| exit_with("Error seeding search", e));
            }
            Err(e) => log::warn!("Previous layout does not match the current tables: {}", e),
        }
    }

    println!("Searching...");
    let start = Instant::now();
    let report_every = (config.iteration.max_generations / 10).max(1);
    let result = engine
        .run_with_callback(|progress| {
            if progress.generation % report_every == 0 {
                println!(
                    "  Restart {} generation {}/{}: best={:.4}, mean={:.4}",
                    progress.restart + 1,
                    progress.generation,
                    progress.max_generations,
                    progress.best_fitness,
                    progress.avg_fitness
                );
            }
        })
        .unwrap_or_else(|e| exit_with("Search failed", e));
    let elapsed = start.elapsed();

    if cli.verbose || cli.debug {
        println!("Best cog array found in {:.4} seconds", elapsed.as_secs_f64());
    }
    log::info!(
        "Search finished in {:.4}s ({} generations, {} evaluations)",
        elapsed.as_secs_f64(),
        result.stats.generations,
        result.stats.total_evaluations
    );

    print_result(&result, cli.verbose || cli.debug);

    let moves = plan_moves(&prior, &result.best.layout);
    let stationary = moves.iter().filter(|m| m.is_stationary()).count();

    for (label, written) in [
        ("report", write_report(&output_dir, &result.best.layout)),
        ("layout", write_layout_record(&output_dir, &result.best.layout)),
        ("moves", write_move_table(&output_dir, &moves)),
    ] {
        match written {
            Ok(path) => println!("Wrote {} to {}", label, path.display()),
            Err(e) => exit_with("Error writing output", e),
        }
    }
    println!("{} of {} cogs already in place", stationary, moves.len());
}

fn print_result(result: &EvolutionResult, verbose: bool) {
    let best = &result.best;

    println!();
    println!("{}", best.layout);
    println!();
    println!("Fitness: {:.6}", best.fitness);
    println!(
        "  build={:.6}, flaggy={:.6}, exp={:.6}",
        best.objectives.build, best.objectives.flaggy, best.objectives.exp
    );
    println!(
        "  found in restart {} generation {}",
        best.restart + 1,
        best.generation
    );

    if verbose {
        for summary in &result.restarts {
            println!(
                "Restart {}: {} generations ({:?}), best {:.6}",
                summary.restart + 1,
                summary.generations,
                summary.stop_reason,
                summary.best_fitness
            );
            for (name, trace) in &summary.history.objectives {
                if let (Some(of_best), Some(max)) = (trace.of_best.last(), trace.max.last()) {
                    println!("  {}: {:.6} on best, {:.6} max", name, of_best, max);
                }
            }
        }
    }
}

fn print_example_config() {
    let config = SearchConfig::default();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => exit_with("Error serializing config", e),
    }
}
