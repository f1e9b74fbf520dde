use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use reachval_rs::{solve, SolveError, Strategy};

#[derive(Parser)]
#[command(name = "reachval", version, about = "Reachable return-value solver")]
struct Cli {
    /// Decision program to solve.
    path: Option<PathBuf>,

    /// Pin the solve strategy instead of letting the heuristic choose.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Stop after strategy selection without running an engine.
    #[arg(long)]
    dry_run: bool,

    /// Log verbosity.
    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum StrategyArg {
    Static,
    Dynamic,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Static => Strategy::Static,
            StrategyArg::Dynamic => Strategy::Dynamic,
        }
    }
}

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    simplelog::TermLogger::init(
        cli.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let Some(path) = cli.path else {
        eprintln!("Usage: reachval <program-file>");
        return Ok(ExitCode::FAILURE);
    };
    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("cannot read {}: {}", path.display(), err);
            return Ok(ExitCode::FAILURE);
        }
    };

    match solve(&source, cli.strategy.map(Strategy::from), cli.dry_run) {
        Ok(solution) => {
            log::info!("strategy: {:?}", solution.strategy);
            let values: Vec<String> = solution.values.iter().map(|v| v.to_string()).collect();
            println!("[{}].", values.join(", "));
            Ok(ExitCode::SUCCESS)
        }
        Err(SolveError::Compilation(diagnostics)) => {
            for diagnostic in &diagnostics {
                eprintln!("{}", diagnostic);
            }
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            eprintln!("{}", err);
            Ok(ExitCode::FAILURE)
        }
    }
}
