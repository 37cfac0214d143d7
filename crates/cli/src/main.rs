#![deny(unsafe_code)]
//! CLI binary for the pigment-mix recipe solver.
//!
//! Subcommands:
//! - `solve <hex>`: find a recipe for one color
//! - `batch <targets.json>`: solve a list of colors, optionally growing the palette
//! - `mix <hex1> <hex2>`: spectral mix or gradient of two colors
//! - `palettes`: list built-in palettes

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use pigment_mix_core::spectral;
use pigment_mix_core::{
    solve, BatchSolver, Palette, SolverConfig, Srgb, Target, Xorshift64,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pigment-mix", about = "Find paint recipes for target colors")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Where the pigments come from.
#[derive(clap::Args)]
struct PaletteArgs {
    /// Built-in palette name (see `palettes`).
    #[arg(short, long, default_value = "primaries")]
    palette: String,

    /// JSON file holding an array of `{"name", "color"}` pigments.
    #[arg(long, conflicts_with = "palette")]
    palette_file: Option<PathBuf>,
}

/// Search settings shared by `solve` and `batch`.
#[derive(clap::Args)]
struct SearchArgs {
    /// JSON file with flat solver settings (population_size, seed, ...).
    #[arg(long)]
    config: Option<PathBuf>,

    /// PRNG seed, overriding the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Generation limit, overriding the config file.
    #[arg(long)]
    generations: Option<usize>,

    /// Population size, overriding the config file.
    #[arg(long)]
    population: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Find a recipe for one target color.
    Solve {
        /// Target color as #rrggbb.
        color: String,

        /// Name for the target (defaults to the hex string).
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        palette: PaletteArgs,

        #[command(flatten)]
        search: SearchArgs,
    },
    /// Solve every target in a JSON file of `{"name", "color"}` entries.
    Batch {
        targets: PathBuf,

        #[command(flatten)]
        palette: PaletteArgs,

        #[command(flatten)]
        search: SearchArgs,

        /// Add each solved mix to the palette for later targets.
        #[arg(long)]
        grow: bool,
    },
    /// Mix two colors spectrally.
    Mix {
        first: String,
        second: String,

        /// Share of the second color.
        #[arg(short, default_value_t = 0.5)]
        t: f64,

        /// Print an N-step gradient instead of a single mix.
        #[arg(long)]
        steps: Option<usize>,
    },
    /// List built-in palettes.
    Palettes,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|e| CliError::Io(format!("{}: {e}", path.display())))
}

fn load_palette(args: &PaletteArgs) -> Result<Palette, CliError> {
    match &args.palette_file {
        Some(path) => serde_json::from_str(&read_file(path)?).map_err(|e| {
            CliError::Input(format!("invalid palette file {}: {e}", path.display()))
        }),
        None => Ok(Palette::from_name(&args.palette)?),
    }
}

fn load_config(args: &SearchArgs) -> Result<SolverConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let params: serde_json::Value = serde_json::from_str(&read_file(path)?)
                .map_err(|e| CliError::Input(format!("invalid config {}: {e}", path.display())))?;
            SolverConfig::from_json(&params)?
        }
        None => SolverConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(generations) = args.generations {
        config.genetic.max_generations = generations;
    }
    if let Some(population) = args.population {
        config.genetic.population_size = population;
    }
    config.validate()?;
    Ok(config)
}

fn load_targets(path: &Path) -> Result<Vec<Target>, CliError> {
    serde_json::from_str(&read_file(path)?)
        .map_err(|e| CliError::Input(format!("invalid targets file {}: {e}", path.display())))
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Palettes => {
            let names = Palette::list_names();
            if cli.json {
                let listing: Vec<_> = names
                    .iter()
                    .map(|&name| -> Result<serde_json::Value, CliError> {
                        let palette = Palette::from_name(name)?;
                        Ok(serde_json::json!({"name": name, "pigments": palette}))
                    })
                    .collect::<Result<_, CliError>>()?;
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for &name in names {
                    let palette = Palette::from_name(name)?;
                    let pigments: Vec<&str> = palette.iter().map(|p| p.name()).collect();
                    println!("{name}: {}", pigments.join(", "));
                }
            }
        }
        Command::Mix {
            first,
            second,
            t,
            steps,
        } => {
            let a = Srgb::from_hex(&first)?;
            let b = Srgb::from_hex(&second)?;
            let colors = match steps {
                Some(n) => spectral::gradient(a, b, n),
                None => vec![spectral::mix(a, b, t)],
            };
            let hexes: Vec<String> = colors.into_iter().map(Srgb::to_hex).collect();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hexes)?);
            } else {
                for hex in hexes {
                    println!("{hex}");
                }
            }
        }
        Command::Solve {
            color,
            name,
            palette,
            search,
        } => {
            let srgb = Srgb::from_hex(&color)?;
            let target = Target::new(name.unwrap_or_else(|| srgb.to_hex()), srgb);
            let palette = Arc::new(load_palette(&palette)?);
            let config = load_config(&search)?;
            info!(pigments = palette.len(), seed = config.seed, "solving {}", target.name());
            let mut rng = Xorshift64::new(config.seed);
            let solution = solve(&target, &palette, &config, &mut rng)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&solution.report())?);
            } else {
                println!("{solution}");
            }
        }
        Command::Batch {
            targets,
            palette,
            search,
            grow,
        } => {
            let targets = load_targets(&targets)?;
            let palette = load_palette(&palette)?;
            let config = load_config(&search)?;
            let mut rng = Xorshift64::new(config.seed);
            info!(targets = targets.len(), grow, "starting batch");
            let mut batch = BatchSolver::new(palette, config)?.with_growth(grow);
            for target in &targets {
                let solution = batch.solve_next(target, &mut rng)?;
                if !cli.json {
                    println!("{solution}\n");
                }
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&batch.report())?);
            } else {
                println!("Pigment usage:");
                for usage in batch.usage() {
                    println!("  {:>3} {}", usage.count, usage.name);
                }
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
