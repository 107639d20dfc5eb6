use clap::{Parser, Subcommand};
use gcr_common::db::core::DesignDB;
use gcr_common::db::parser::gr;
use gcr_common::util::config::Config;
use gcr_common::util::generator::{self, GeneratorParams};
use gcr_common::util::{logger, visualization};
use gcr_router::global_router::GlobalRouter;
use gcr_router::{check, solution};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a `.gr` benchmark and write the solution.
    Route {
        /// Overrides `input.gr_file`.
        #[arg(long)]
        input: Option<String>,
        /// Overrides `input.output_file`.
        #[arg(long)]
        output: Option<String>,
    },
    /// Score an existing solution and draw its congestion map.
    Map {
        /// Overrides `input.gr_file`.
        #[arg(long)]
        input: Option<String>,
        /// Route file to load, defaults to `input.output_file`.
        #[arg(long)]
        solution: Option<String>,
        /// Overrides `input.congestion_map`.
        #[arg(long)]
        map: Option<String>,
    },
    /// Write a random two-pin benchmark.
    Generate {
        #[arg(long, default_value_t = 32)]
        size: u32,
        #[arg(long, default_value_t = 2)]
        layers: u8,
        #[arg(long, default_value_t = 8)]
        capacity: u32,
        #[arg(long, default_value_t = 200)]
        nets: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, default_value = "inputs/random.gr")]
        output: String,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    let command = args.command.unwrap_or(Commands::Route {
        input: None,
        output: None,
    });

    match command {
        Commands::Generate {
            size,
            layers,
            capacity,
            nets,
            seed,
            output,
        } => {
            prepare_output_dir(&output)?;
            let params = GeneratorParams {
                grid_x: size,
                grid_y: size,
                layers,
                capacity,
                num_nets: nets,
                seed,
                ..GeneratorParams::default()
            };
            let mut file = BufWriter::new(File::create(&output)?);
            generator::generate_random_gr(&mut file, &params)?;
            log::info!("Generated: {}", output);
        }
        Commands::Route { input, output } => {
            let input = input.unwrap_or_else(|| config.input.gr_file.clone());
            let output = output.unwrap_or_else(|| config.input.output_file.clone());
            if !Path::new(&input).exists() {
                return Err(anyhow::anyhow!("Input GR file missing: {}", input));
            }
            prepare_output_dir(&output)?;

            if let Err(e) = run_routing(&config, &input, &output) {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Map {
            input,
            solution,
            map,
        } => {
            let input = input.unwrap_or_else(|| config.input.gr_file.clone());
            let solution = solution.unwrap_or_else(|| config.input.output_file.clone());
            let map = map.or_else(|| config.input.congestion_map.clone());
            for path in [&input, &solution] {
                if !Path::new(path).exists() {
                    return Err(anyhow::anyhow!("Input file missing: {}", path));
                }
            }

            if let Err(e) = run_mapping(&config, &input, &solution, map.as_deref()) {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent()
        && !parent.exists()
        && !parent.as_os_str().is_empty()
    {
        log::info!("Creating output directory: {:?}", parent);
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn run_routing(config: &Config, input: &str, output: &str) -> anyhow::Result<()> {
    let mut design = DesignDB::new();
    log::info!("Parsing GR: {}", input);
    gr::parse(&mut design, input)?;

    log::info!("Starting Routing...");
    let router = gcr_router::route(&design, &config.global_routing)
        .map_err(|e| anyhow::anyhow!(e))?;

    let stats = router.statistics();
    log::info!(
        "Final: {} routed, {} unrouted, overflow {} ({} edges, max {}), {} segments, {} vias",
        stats.routed_nets,
        stats.unrouted_nets,
        stats.total_overflow,
        stats.overfull_edges,
        stats.max_overflow,
        stats.total_segments,
        stats.total_vias
    );

    check::run(&router).map_err(|e| anyhow::anyhow!("Verification Failed: {}", e))?;

    log::info!("Writing routes to {}", output);
    let mut file = BufWriter::new(File::create(output)?);
    solution::write_routes(&mut file, &design, &router)?;

    if let Some(map_path) = config.input.congestion_map.as_deref() {
        write_congestion_map(&router, map_path)?;
    }

    Ok(())
}

fn run_mapping(
    config: &Config,
    input: &str,
    solution_file: &str,
    map_path: Option<&str>,
) -> anyhow::Result<()> {
    let mut design = DesignDB::new();
    log::info!("Parsing GR: {}", input);
    gr::parse(&mut design, input)?;

    let mut router = GlobalRouter::from_design(&design, &config.global_routing)
        .map_err(|e| anyhow::anyhow!(e))?;
    log::info!("Reading routes from {}", solution_file);
    solution::read_routes(&mut router, &design, solution_file)?;

    router.log_statistics("solution");
    for net in router.nets().iter().filter(|n| !n.routed) {
        log::warn!("Net '{}' has no route in {}", net.name, solution_file);
    }
    if let Err(e) = check::run(&router) {
        log::warn!("Solution does not verify: {}", e);
    }

    match map_path {
        Some(path) => write_congestion_map(&router, path)?,
        None => log::warn!("No congestion map path given, nothing drawn"),
    }
    Ok(())
}

fn write_congestion_map(router: &GlobalRouter, map_path: &str) -> anyhow::Result<()> {
    if map_path.is_empty() {
        return Ok(());
    }
    prepare_output_dir(map_path)?;
    log::info!("Generating congestion map: {}", map_path);
    let grid = router.grid();
    visualization::draw_congestion_map(
        &grid.congestion_map(),
        grid.size_x(),
        grid.size_y(),
        map_path,
        8,
    )?;
    Ok(())
}
