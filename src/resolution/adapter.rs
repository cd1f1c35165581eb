//! Boundary with the external MIP solver.

use std::time::Duration;

use good_lp::{
    constraint, solvers::microlp::microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use tracing::{debug, warn};

use crate::error::SolverFailure;
use crate::model::{Assignment, ClspModel, Sense, VarId, VarKind};

/// What a solver can report back for a formulated model.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Optimal { objective: f64, assignment: Assignment },
    Infeasible,
    SolverError(String),
}

impl SolveOutcome {
    /// Splits the outcome into the optimum or the failure to report upward.
    pub fn into_result(self) -> Result<(f64, Assignment), SolverFailure> {
        match self {
            SolveOutcome::Optimal { objective, assignment } => Ok((objective, assignment)),
            SolveOutcome::Infeasible => Err(SolverFailure::Infeasible),
            SolveOutcome::SolverError(reason) => Err(SolverFailure::Internal(reason)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Wall-clock budget handed to backends that honour one.
    pub time_limit: Option<Duration>,
}

pub trait MipSolver {
    fn solve(&self, model: &ClspModel) -> SolveOutcome;
}

/// Pure Rust branch-and-bound backend, through `good_lp`.
#[derive(Debug, Clone, Default)]
pub struct MicroLpSolver {
    pub config: SolverConfig,
}

impl MicroLpSolver {
    pub fn new(config: SolverConfig) -> Self {
        MicroLpSolver { config }
    }
}

fn linear(terms: &[(VarId, f64)], vars: &[Variable]) -> Expression {
    let mut expr = Expression::from(0.0);
    for (v, c) in terms {
        expr += *c * vars[v.index()];
    }
    expr
}

impl MipSolver for MicroLpSolver {
    fn solve(&self, model: &ClspModel) -> SolveOutcome {
        if let Some(limit) = self.config.time_limit {
            debug!(?limit, "microlp has no time limit, running to completion");
        }

        let mut problem_vars = ProblemVariables::new();
        let vars: Vec<Variable> = model
            .vars()
            .iter()
            .map(|def| {
                let definition = match def.kind {
                    VarKind::Binary => variable().binary(),
                    VarKind::NonNegative => variable().min(0.0),
                };
                problem_vars.add(definition.name(def.name.clone()))
            })
            .collect();

        let objective = linear(model.objective(), &vars);
        let mut problem = problem_vars.minimise(objective).using(microlp);
        for c in model.constraints() {
            let lhs = linear(&c.terms, &vars);
            let rhs = Expression::from(c.rhs);
            let constraint = match c.sense {
                Sense::LessEq => constraint::leq(lhs, rhs),
                Sense::Equal => constraint::eq(lhs, rhs),
            };
            problem.add_constraint(constraint);
        }

        match problem.solve() {
            Ok(solution) => {
                let values: Vec<f64> = vars.iter().map(|v| solution.value(*v)).collect();
                SolveOutcome::Optimal {
                    objective: model.objective_value(&values),
                    assignment: model.assignment(&values),
                }
            }
            Err(ResolutionError::Infeasible) => SolveOutcome::Infeasible,
            Err(err) => {
                warn!(%err, "solver did not return a solution");
                SolveOutcome::SolverError(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn failures_keep_their_reason() {
        assert_eq!(SolveOutcome::Infeasible.into_result().unwrap_err(), SolverFailure::Infeasible);
        assert_eq!(
            SolveOutcome::SolverError("unbounded".into()).into_result().unwrap_err(),
            SolverFailure::Internal("unbounded".into())
        );
    }

    #[test]
    fn optimum_passes_through() {
        let assignment = Assignment {
            setup: Grid::filled(1, 1, 1.0),
            produce: Grid::filled(1, 1, 3.0),
            inventory: Grid::filled(1, 0, 0.0),
            initial_inventory: vec![0.0],
        };
        let outcome = SolveOutcome::Optimal { objective: 7.0, assignment: assignment.clone() };
        assert_eq!(outcome.into_result().unwrap(), (7.0, assignment));
    }
}
