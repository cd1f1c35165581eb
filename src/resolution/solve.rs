use std::{fs::File, io::BufWriter, path::PathBuf, time::{Duration, Instant}};

use clap::Args;
use tracing::{info, warn};

use crate::error::Result;
use crate::instance::{ClspInstance, InstanceFormat, ProdTimePolicy, TrigeiroPolicy};
use crate::model::{formulate, Assignment};
use crate::report::{CapacityTable, PlanTable, ResultRecord};
use crate::resolution::adapter::{MicroLpSolver, MipSolver, SolverConfig};
use crate::verify::{verify, VerificationReport};

#[derive(Debug, Args)]
pub struct Solve {
    /// The path to the instance file
    #[clap(short, long)]
    pub instance: PathBuf,
    /// Layout of the instance file
    #[clap(short, long, value_enum, default_value = "trigeiro")]
    pub format: InstanceFormat,
    /// Wall-clock budget (seconds) handed to the solver
    #[clap(short, long, default_value = "180")]
    pub timeout: u64,
    /// Number of future periods whose demand may justify carried stock
    /// [default: 6, or the value stored in a json instance]
    #[clap(long)]
    pub hop: Option<usize>,
    /// Read unit production times from the Trigeiro file instead of forcing them to 1
    #[clap(long)]
    pub prod_time_from_file: bool,
    /// File the tab-separated results record is appended to
    #[clap(long, default_value = "result.csv")]
    pub results: PathBuf,
    /// If present, the path where to write the solution as json
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

/// Everything a successful solve produced.
#[derive(Debug, Clone)]
pub struct Solved {
    pub objective: f64,
    pub assignment: Assignment,
    pub report: VerificationReport,
}

/// Formulates `instance`, solves it with `solver` and verifies the answer.
/// The returned report may carry discrepancies; turning them into an error is
/// left to the caller so the results can be shown first.
pub fn solve_instance(instance: &ClspInstance, solver: &impl MipSolver) -> Result<Solved> {
    let model = formulate(instance)?;
    info!(
        variables = model.vars().len(),
        constraints = model.constraints().len(),
        "model formulated"
    );

    let (objective, assignment) = solver.solve(&model).into_result()?;
    info!(objective, "solver returned an optimum");

    let report = verify(instance, &assignment, objective)?;
    if !report.is_consistent() {
        warn!(count = report.discrepancies.len(), "solution does not verify, objective is suspect");
    }
    Ok(Solved { objective, assignment, report })
}

impl Solve {
    fn policy(&self) -> TrigeiroPolicy {
        if self.prod_time_from_file {
            TrigeiroPolicy { unit_prod_time: ProdTimePolicy::FromFile }
        } else {
            TrigeiroPolicy::default()
        }
    }

    pub fn solve(&self) -> Result<()> {
        let start = Instant::now();

        let mut instance = ClspInstance::load(&self.instance, self.format, self.policy())?;
        if let Some(hop) = self.hop {
            instance = instance.with_hop_horizon(hop)?;
        }
        info!(
            file = %self.instance.display(),
            items = instance.item_count(),
            periods = instance.period_count(),
            hop = instance.hop_horizon(),
            time_limit = self.timeout,
            "instance loaded"
        );

        let solver = MicroLpSolver::new(SolverConfig { time_limit: Some(Duration::from_secs(self.timeout)) });
        let solved = solve_instance(&instance, &solver)?;
        let elapsed = start.elapsed().as_secs_f64();

        println!("{}", PlanTable { instance: &instance, assignment: &solved.assignment });
        print!("{}", CapacityTable(&solved.report));
        println!("z* = {} found in {elapsed:.3} seconds.", solved.objective);

        ResultRecord {
            items: instance.item_count(),
            periods: instance.period_count(),
            hop: instance.hop_horizon(),
            objective: solved.objective,
            elapsed_secs: elapsed,
        }
        .append_to(&self.results)?;

        if let Some(output) = self.output.as_ref() {
            serde_json::to_writer_pretty(BufWriter::new(File::create(output)?), &solved.assignment)?;
        }

        solved.report.into_result().map(|_| ())
    }
}
