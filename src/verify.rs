//! Independent check of a solver assignment against the instance.
//!
//! Nothing reported by the solver is trusted except the variable values:
//! capacity usage, demand balance and cost are all recomputed from the
//! instance data.

use std::fmt;

use tracing::warn;

use crate::error::{ClspError, Result};
use crate::instance::ClspInstance;
use crate::model::{Assignment, BIG_PENALTY};

/// Setup and inventory values above this count as active.
pub const ACTIVITY_THRESHOLD: f64 = 0.1;

pub const RELATIVE_TOLERANCE: f64 = 1e-6;

/// Stock below this is solver noise and is not priced.
pub const SOLVER_NOISE: f64 = 1e-6;

fn tolerance(reference: f64) -> f64 {
    RELATIVE_TOLERANCE * reference.abs().max(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodUsage {
    pub period: usize,
    pub used: f64,
    pub capacity: f64,
}

impl PeriodUsage {
    pub fn is_within_capacity(&self) -> bool {
        self.used <= self.capacity + tolerance(self.capacity)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBreakdown {
    pub setup: f64,
    /// Every unit of stock carried, as the objective prices it.
    pub holding: f64,
    /// Only stock above [`ACTIVITY_THRESHOLD`].
    pub active_holding: f64,
    pub production: f64,
    pub initial_stock_penalty: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.setup + self.holding + self.production + self.initial_stock_penalty
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Discrepancy {
    CapacityExceeded { period: usize, used: f64, capacity: f64 },
    CostMismatch { recomputed: f64, reported: f64 },
    BalanceResidual { item: usize, period: usize, residual: f64 },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::CapacityExceeded { period, used, capacity } => {
                write!(f, "period {} uses {used} of capacity {capacity}", period + 1)
            }
            Discrepancy::CostMismatch { recomputed, reported } => {
                write!(f, "recomputed cost {recomputed} differs from reported objective {reported}")
            }
            Discrepancy::BalanceResidual { item, period, residual } => {
                write!(f, "item {} period {} does not balance (residual {residual})", item + 1, period + 1)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub usage: Vec<PeriodUsage>,
    pub cost: CostBreakdown,
    pub reported_objective: f64,
    pub discrepancies: Vec<Discrepancy>,
}

impl VerificationReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }

    /// Setup cost plus the holding cost of active stock, the figure
    /// benchmark logs usually quote.
    pub fn setup_and_holding_cost(&self) -> f64 {
        self.cost.setup + self.cost.active_holding
    }

    pub fn into_result(self) -> Result<Self> {
        if self.is_consistent() {
            return Ok(self);
        }
        let details = self.discrepancies.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        Err(ClspError::Verification(details))
    }
}

fn check_shape(instance: &ClspInstance, assignment: &Assignment) -> Result<()> {
    let (p, t) = (instance.item_count(), instance.period_count());
    let shapes = [
        ("setup", assignment.setup.rows(), assignment.setup.cols(), t),
        ("produce", assignment.produce.rows(), assignment.produce.cols(), t),
        ("inventory", assignment.inventory.rows(), assignment.inventory.cols(), t - 1),
    ];
    for (name, rows, cols, expected) in shapes {
        if rows != p || cols != expected {
            return Err(ClspError::Verification(format!(
                "{name} values are {rows}x{cols}, expected {p}x{expected}"
            )));
        }
    }
    if assignment.initial_inventory.len() != p {
        return Err(ClspError::Verification(format!(
            "{} initial inventories for {p} items",
            assignment.initial_inventory.len()
        )));
    }
    Ok(())
}

/// Recomputes capacity usage, demand balance and cost of `assignment` and
/// compares them with the instance and the solver's objective.
pub fn verify(instance: &ClspInstance, assignment: &Assignment, reported_objective: f64) -> Result<VerificationReport> {
    check_shape(instance, assignment)?;
    let (p, t_count) = (instance.item_count(), instance.period_count());
    let mut discrepancies = vec![];

    let usage: Vec<PeriodUsage> = (0..t_count)
        .map(|t| {
            let used = (0..p)
                .filter(|&j| assignment.setup[(j, t)] > ACTIVITY_THRESHOLD)
                .map(|j| instance.setup_time()[(j, t)] + instance.unit_prod_time()[(j, t)] * assignment.produce[(j, t)])
                .sum();
            PeriodUsage { period: t, used, capacity: instance.capacity()[t] }
        })
        .collect();
    for u in usage.iter().filter(|u| !u.is_within_capacity()) {
        discrepancies.push(Discrepancy::CapacityExceeded { period: u.period, used: u.used, capacity: u.capacity });
    }

    for j in 0..p {
        for t in 0..t_count {
            let incoming = if t == 0 { assignment.initial_inventory[j] } else { assignment.inventory[(j, t - 1)] };
            let demand = instance.demand()[(j, t)];
            let residual = assignment.produce[(j, t)] + incoming - assignment.ending_inventory(j, t) - demand;
            if residual.abs() > tolerance(demand) {
                discrepancies.push(Discrepancy::BalanceResidual { item: j, period: t, residual });
            }
        }
    }

    let mut cost = CostBreakdown::default();
    for j in 0..p {
        cost.initial_stock_penalty += BIG_PENALTY * assignment.initial_inventory[j];
        for t in 0..t_count {
            if assignment.setup[(j, t)] > ACTIVITY_THRESHOLD {
                cost.setup += instance.setup_cost()[(j, t)];
            }
            let stock = assignment.ending_inventory(j, t);
            if stock > SOLVER_NOISE {
                cost.holding += stock * instance.holding_cost()[(j, t)];
            }
            if stock > ACTIVITY_THRESHOLD {
                cost.active_holding += stock * instance.holding_cost()[(j, t)];
            }
            cost.production += instance.unit_prod_cost()[(j, t)] * assignment.produce[(j, t)];
        }
    }
    if (cost.total() - reported_objective).abs() > tolerance(reported_objective) {
        discrepancies.push(Discrepancy::CostMismatch { recomputed: cost.total(), reported: reported_objective });
    }

    for d in &discrepancies {
        warn!(%d, "verification discrepancy");
    }

    Ok(VerificationReport { usage, cost, reported_objective, discrepancies })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::grid::Grid;
    use crate::instance::tests::two_by_three;

    fn instance() -> ClspInstance {
        ClspInstance::try_from(two_by_three()).unwrap()
    }

    /// Both items produced in full in the first period.
    fn front_loaded() -> Assignment {
        Assignment {
            setup: Grid::from_fn(2, 3, |_, t| if t == 0 { 1.0 } else { 0.0 }),
            produce: Grid::from_fn(2, 3, |_, t| if t == 0 { 30.0 } else { 0.0 }),
            inventory: Grid::from_fn(2, 2, |_, t| if t == 0 { 20.0 } else { 10.0 }),
            initial_inventory: vec![0.0, 0.0],
        }
    }

    #[test]
    fn consistent_plan_passes() {
        let report = verify(&instance(), &front_loaded(), 220.0).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.usage[0].used, 70.0);
        assert_eq!(report.usage[1].used, 0.0);
        assert_eq!(report.cost.setup, 100.0);
        assert_eq!(report.cost.holding, 120.0);
        assert_eq!(report.setup_and_holding_cost(), 220.0);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn wrong_objective_is_a_mismatch() {
        let report = verify(&instance(), &front_loaded(), 200.0).unwrap();
        assert_eq!(report.discrepancies, vec![Discrepancy::CostMismatch { recomputed: 220.0, reported: 200.0 }]);
        assert!(matches!(report.into_result(), Err(ClspError::Verification(_))));
    }

    #[test]
    fn overload_is_reported() {
        let mut data = two_by_three();
        data.capacity = vec![60.0, 100.0, 100.0];
        let instance = ClspInstance::try_from(data).unwrap();
        let report = verify(&instance, &front_loaded(), 220.0).unwrap();
        assert!(matches!(report.discrepancies[..], [Discrepancy::CapacityExceeded { period: 0, .. }]));
    }

    #[test]
    fn production_without_setup_uses_no_capacity() {
        let mut plan = front_loaded();
        plan.setup[(1, 0)] = 0.0;
        let report = verify(&instance(), &plan, 170.0).unwrap();
        assert_eq!(report.usage[0].used, 35.0);
        assert!(report.is_consistent());
    }

    #[test]
    fn missing_material_is_a_balance_residual() {
        let mut plan = front_loaded();
        plan.produce[(0, 0)] = 25.0;
        let report = verify(&instance(), &plan, 220.0).unwrap();
        assert!(report
            .discrepancies
            .contains(&Discrepancy::BalanceResidual { item: 0, period: 0, residual: -5.0 }));
    }

    #[test]
    fn initial_stock_is_priced_with_the_penalty() {
        let mut plan = front_loaded();
        plan.produce[(0, 0)] = 25.0;
        plan.initial_inventory[0] = 5.0;
        let report = verify(&instance(), &plan, 220.0 + 5.0 * BIG_PENALTY).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.cost.initial_stock_penalty, 50_000.0);
    }

    #[test]
    fn fractional_stock_is_priced_in_the_objective() {
        let mut data = two_by_three();
        data.nb_items = 1;
        data.nb_periods = 2;
        data.capacity = vec![100.0; 2];
        data.demand = vec![vec![0.0, 0.05]];
        data.unit_prod_cost = vec![vec![0.0; 2]];
        data.setup_cost = vec![vec![100.0, 200.0]];
        data.holding_cost = vec![vec![1.0; 2]];
        data.unit_prod_time = vec![vec![1.0; 2]];
        data.setup_time = vec![vec![5.0; 2]];
        data.hop_horizon = 2;
        let instance = ClspInstance::try_from(data).unwrap();
        let plan = Assignment {
            setup: Grid::from_fn(1, 2, |_, t| if t == 0 { 1.0 } else { 0.0 }),
            produce: Grid::from_fn(1, 2, |_, t| if t == 0 { 0.05 } else { 0.0 }),
            inventory: Grid::filled(1, 1, 0.05),
            initial_inventory: vec![0.0],
        };

        let report = verify(&instance, &plan, 100.05).unwrap();
        assert!(report.is_consistent(), "{:?}", report.discrepancies);
        assert!((report.cost.holding - 0.05).abs() < 1e-12);
        assert_eq!(report.cost.active_holding, 0.0);
        assert_eq!(report.setup_and_holding_cost(), 100.0);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut plan = front_loaded();
        plan.initial_inventory.push(0.0);
        assert!(matches!(verify(&instance(), &plan, 220.0), Err(ClspError::Verification(_))));
    }

    proptest! {
        #[test]
        fn verification_is_repeatable(produce in prop::collection::vec(0.0..40.0f64, 6), setups in prop::collection::vec(any::<bool>(), 6)) {
            let plan = Assignment {
                setup: Grid::from_fn(2, 3, |j, t| if setups[j * 3 + t] { 1.0 } else { 0.0 }),
                produce: Grid::from_fn(2, 3, |j, t| produce[j * 3 + t]),
                inventory: Grid::filled(2, 2, 1.5),
                initial_inventory: vec![0.0, 2.0],
            };
            let instance = instance();
            let first = verify(&instance, &plan, 123.0).unwrap();
            let second = verify(&instance, &plan, 123.0).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
