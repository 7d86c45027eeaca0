mod logging;
mod report;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use shelfplan_model::{DemoSettings, PlanError, PlannerConfig, PlanningModel, Scenario, ScenarioError};
use shelfplan_solver::{BranchAndBound, HighsSolver, MilpSolver};
use thiserror::Error;
use tracing::info;

use crate::report::Format;

#[derive(Parser)]
#[command(name = "shelfplan")]
#[command(about = "Production planning for perishable goods", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a scenario file and print the plan
    Solve {
        /// The scenario file (JSON)
        file: PathBuf,
        #[command(flatten)]
        solve: SolveArgs,
    },
    /// Generate a random scenario and solve it
    Demo {
        #[command(flatten)]
        demo: DemoArgs,
        #[command(flatten)]
        solve: SolveArgs,
    },
    /// Write a random scenario as JSON
    Generate {
        #[command(flatten)]
        demo: DemoArgs,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Validate a scenario file and report the model size
    Check {
        /// The scenario file (JSON)
        file: PathBuf,
    },
}

#[derive(Args)]
struct SolveArgs {
    /// Wall-clock limit for the solver, in seconds
    #[arg(short, long)]
    time_limit: Option<f64>,
    /// Solver configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: Format,
    /// MILP engine
    #[arg(long, value_enum, default_value = "highs")]
    engine: Engine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// HiGHS branch-and-cut
    Highs,
    /// Built-in branch-and-bound, only practical for small scenarios
    Reference,
}

#[derive(Args)]
struct DemoArgs {
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 5)]
    weeks: u32,
    #[arg(long, default_value_t = 2)]
    products: u32,
    #[arg(long, default_value_t = 1)]
    plants: u32,
    /// Production lines per plant
    #[arg(long, default_value_t = 2)]
    lines: u32,
}

impl DemoArgs {
    fn settings(&self) -> DemoSettings {
        DemoSettings {
            plants: self.plants,
            lines_per_plant: self.lines,
            products: self.products,
            weeks: self.weeks,
            seed: self.seed,
        }
    }
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("Error writing output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("Error writing {}: {source}", .path.display())]
    Write { path: PathBuf, source: std::io::Error },
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Solve { file, solve } => {
            info!("Loading scenario {}", file.display());
            let scenario = Scenario::load(&file)?;
            solve_and_report(&scenario, &solve)
        }
        Commands::Demo { demo, solve } => {
            let scenario = demo.settings().generate()?;
            solve_and_report(&scenario, &solve)
        }
        Commands::Generate { demo, out } => {
            let json = demo.settings().generate()?.to_json_string()?;
            match out {
                Some(path) => write_file(&path, &json),
                None => {
                    println!("{}", json);
                    Ok(())
                }
            }
        }
        Commands::Check { file } => {
            let scenario = match Scenario::load(&file) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            };
            let planning = PlanningModel::build(&scenario)?;
            let problem = planning.model().problem();

            println!("✓ {} is valid", file.display());
            println!("  {} days", scenario.horizon().len());
            println!("  {} plants", scenario.plants().len());
            println!("  {} production lines", scenario.lines().count());
            println!("  {} products", scenario.products().len());
            println!(
                "  {} variables ({} integer), {} constraints",
                problem.num_variables(),
                problem.num_integer_variables(),
                problem.num_constraints()
            );
            Ok(())
        }
    }
}

fn solve_and_report(scenario: &Scenario, args: &SolveArgs) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    if let Some(secs) = args.time_limit {
        config = config.with_time_limit_secs(secs)?;
    }

    let planning = PlanningModel::build(scenario)?;
    let solver: Box<dyn MilpSolver> = match args.engine {
        Engine::Highs => Box::new(HighsSolver::new()),
        Engine::Reference => Box::new(BranchAndBound::new()),
    };
    let plan = planning.solve(solver.as_ref(), &config.solve_options())?;

    match args.format {
        Format::Table => print!("{}", report::render_table(&plan)),
        Format::Json => println!("{}", report::render_json(&plan)?),
    }
    info!("Done!");
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Scenario written to {}", path.display());
    Ok(())
}
