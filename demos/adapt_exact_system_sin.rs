//! Adaptive solution of the harmonic system `u' = v, v' = -u` on `[0, 2π]` with initial
//! conditions `u(0) = 0, v(0) = 1`, whose exact solution is `(sin x, cos x)`.
//!
//! Usage: `adapt_exact_system_sin [config.json]`, where the optional JSON file overrides
//! fields of the default configuration. Without boundary conditions in the file, the initial
//! conditions of the harmonic system are used. Convergence histories are written to the working
//! directory. The process exits with a non-zero status if the final mesh exceeds 40 DOFs.
use eyre::WrapErr;
use hpadapt::adaptivity::{AdaptiveLoop, AdaptivityConfig};
use hpadapt::problems::HarmonicSystem;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;
use std::time::Instant;

const MAX_DOFS: usize = 40;

fn load_config(problem: &HarmonicSystem) -> eyre::Result<AdaptivityConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let file = File::open(&path).wrap_err_with(|| format!("failed to open config file {}", path))?;
            let config: AdaptivityConfig =
                serde_json::from_reader(file).wrap_err_with(|| format!("failed to parse config file {}", path))?;
            Ok(config.or_boundary_conditions(problem.boundary_conditions()))
        }
        None => Ok(AdaptivityConfig::default().with_boundary_conditions(problem.boundary_conditions())),
    }
}

fn main() -> eyre::Result<()> {
    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Debug, Config::default(), File::create("application.log")?),
    ])?;

    let problem = HarmonicSystem::default();
    let config = load_config(&problem)?;
    info!("Configuration: {:?}", config);

    let start = Instant::now();
    let weak_form = problem.weak_form();
    let outcome = AdaptiveLoop::new(config, &weak_form)
        .with_exact_solution(problem)
        .run()?;
    info!("Total running time: {:.3} s", start.elapsed().as_secs_f64());

    outcome.tracker.save_to_dir(".")?;
    info!(
        "Final mesh: {} elements with degrees {:?}, {} DOFs, stopped with {:?}.",
        outcome.space.num_elements(),
        outcome.space.degrees(),
        outcome.num_dofs(),
        outcome.stop_reason
    );

    if outcome.within_dof_budget(MAX_DOFS) {
        info!("Success!");
        Ok(())
    } else {
        info!("Failure: more than {} DOFs.", MAX_DOFS);
        std::process::exit(1)
    }
}
