use anyhow::{Context, Error};
use argh::FromArgs;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

use emission_check::{
    compare_with, write_report, write_trace, BdfIntegrator, Comparison, RecordingObserver,
    Scenario, ScenarioFile,
};

#[derive(Debug, FromArgs)]
/// Compares the numeric solution of the two-compartment emission model with its analytic solution.
struct Opt {
    #[argh(positional)]
    /// JSON file with the scenarios to run; the reference pair (relTol 0.01 and 0.001) when omitted
    scenarios: Option<PathBuf>,
    #[argh(switch)]
    /// print the comparisons as JSON instead of tab-separated tables
    json: bool,
    #[argh(option)]
    /// write every right-hand side and Jacobian evaluation to this file
    trace: Option<PathBuf>,
    #[argh(switch, short = 'v')]
    /// generate verbose output
    verbose: bool,
}

fn main() {
    let opt: Opt = argh::from_env();
    if let Err(e) = run(opt) {
        error!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Error> {
    if opt.verbose {
        tracing_subscriber::fmt().compact().with_max_level(tracing::Level::DEBUG).init();
    } else {
        tracing_subscriber::fmt().compact().with_max_level(tracing::Level::INFO).init();
    }

    let file = match &opt.scenarios {
        Some(path) => ScenarioFile::from_path(path)
            .with_context(|| format!("Unable to read scenarios from {}", path.display()))?,
        None => ScenarioFile::reference(),
    };
    info!("Running {} scenario(s)", file.scenarios.len());

    let mut trace = match &opt.trace {
        Some(path) => Some(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Unable to create trace file {}", path.display()))?,
        )),
        None => None,
    };

    let mut comparisons = Vec::with_capacity(file.scenarios.len());
    for (index, scenario) in file.scenarios.iter().enumerate() {
        let comparison = run_scenario(scenario, trace.as_mut())
            .with_context(|| format!("Scenario {} failed", index))?;
        let errors = comparison.max_relative_error();
        info!(
            scenario = index,
            rel_tol = scenario.rel_tol,
            air = errors.air,
            product = errors.product,
            "Maximum relative error"
        );
        comparisons.push(comparison);
    }

    let stdout = io::stdout();
    if opt.json {
        serde_json::to_writer_pretty(stdout.lock(), &comparisons)?;
        println!();
    } else {
        for comparison in &comparisons {
            write_report(comparison, stdout.lock())?;
            println!();
        }
    }
    Ok(())
}

fn run_scenario(
    scenario: &Scenario,
    trace: Option<&mut BufWriter<File>>,
) -> Result<Comparison, Error> {
    let integrator = BdfIntegrator::new(scenario.solver);
    match trace {
        Some(writer) => {
            let recorder = RecordingObserver::new();
            let comparison = compare_with(scenario, &integrator, &recorder)?;
            write_trace(scenario, &recorder, writer)?;
            Ok(comparison)
        }
        None => Ok(emission_check::compare(scenario)?),
    }
}
