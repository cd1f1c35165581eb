//! Solver-neutral MIP formulation of the CLSP with hop constraints.
//!
//! Variables, per item `j` and period `t`:
//! - `setup[j][t]` binary, 1 when item `j` is produced in period `t`;
//! - `produce[j][t] ≥ 0`;
//! - `inventory[j][t] ≥ 0`, ending stock, for `t ≤ T − 2` only (the stock left
//!   after the last period is structurally zero);
//! - `initial_inventory[j] ≥ 0`, stock available before the first period,
//!   priced at [`BIG_PENALTY`] per unit.

use serde::Serialize;
use tracing::debug;

use crate::error::{ClspError, Result};
use crate::grid::Grid;
use crate::instance::ClspInstance;
use crate::params::{hop_periods, hop_rhs, DerivedParams};

/// Unit cost of initial inventory. Dominates every legitimate cost so that
/// starting stock is only used when nothing else is feasible.
pub const BIG_PENALTY: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    /// Continuous with lower bound zero
    NonNegative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    LessEq,
    Equal,
}

/// Which family a constraint belongs to, with the indices it was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Capacity { period: usize },
    Balance { item: usize, period: usize },
    SetupLink { item: usize, period: usize },
    Hop { item: usize, period: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub family: Family,
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|(v, c)| c * values[v.0]).sum()
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        match self.sense {
            Sense::LessEq => lhs <= self.rhs + tolerance,
            Sense::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// Values of every decision variable, indexed like the instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub setup: Grid<f64>,
    pub produce: Grid<f64>,
    /// `items x (periods - 1)`
    pub inventory: Grid<f64>,
    pub initial_inventory: Vec<f64>,
}

impl Assignment {
    /// Ending inventory of `item` after `period`; zero after the last period.
    pub fn ending_inventory(&self, item: usize, period: usize) -> f64 {
        if period < self.inventory.cols() {
            self.inventory[(item, period)]
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClspModel {
    vars: Vec<VarDef>,
    setup: Grid<VarId>,
    produce: Grid<VarId>,
    inventory: Grid<VarId>,
    initial_inventory: Vec<VarId>,
    constraints: Vec<LinearConstraint>,
    objective: Vec<(VarId, f64)>,
}

struct VarTable {
    vars: Vec<VarDef>,
}

impl VarTable {
    fn add(&mut self, name: String, kind: VarKind) -> VarId {
        self.vars.push(VarDef { name, kind });
        VarId(self.vars.len() - 1)
    }

    fn grid(&mut self, prefix: &str, rows: usize, cols: usize, kind: VarKind) -> Grid<VarId> {
        Grid::from_fn(rows, cols, |j, t| self.add(format!("{prefix}[{j},{t}]"), kind))
    }
}

/// Builds the full model for `instance`. Fails when the hop horizon does not
/// lie in `[1, T]`.
pub fn formulate(instance: &ClspInstance) -> Result<ClspModel> {
    let (p, t_count) = (instance.item_count(), instance.period_count());
    let hop = instance.hop_horizon();
    if hop == 0 || hop > t_count {
        return Err(ClspError::Model(format!(
            "hop horizon {hop} must lie between 1 and the number of periods ({t_count})"
        )));
    }

    let params = DerivedParams::derive(instance)?;

    let mut table = VarTable { vars: Vec::with_capacity(p * (3 * t_count + 1)) };
    let setup = table.grid("setup", p, t_count, VarKind::Binary);
    let produce = table.grid("produce", p, t_count, VarKind::NonNegative);
    let inventory = table.grid("inventory", p, t_count - 1, VarKind::NonNegative);
    let initial_inventory: Vec<VarId> =
        (0..p).map(|j| table.add(format!("initial_inventory[{j}]"), VarKind::NonNegative)).collect();

    let mut constraints = vec![];

    // capacity, the only coupling between items
    for t in 0..t_count {
        let mut terms = Vec::with_capacity(2 * p);
        for j in 0..p {
            terms.push((produce[(j, t)], instance.unit_prod_time()[(j, t)]));
            terms.push((setup[(j, t)], instance.setup_time()[(j, t)]));
        }
        constraints.push(LinearConstraint {
            family: Family::Capacity { period: t },
            terms,
            sense: Sense::LessEq,
            rhs: instance.capacity()[t],
        });
    }

    // demand balance
    for j in 0..p {
        for t in 0..t_count {
            let incoming = if t == 0 { initial_inventory[j] } else { inventory[(j, t - 1)] };
            let mut terms = vec![(produce[(j, t)], 1.0), (incoming, 1.0)];
            if t < t_count - 1 {
                terms.push((inventory[(j, t)], -1.0));
            }
            constraints.push(LinearConstraint {
                family: Family::Balance { item: j, period: t },
                terms,
                sense: Sense::Equal,
                rhs: instance.demand()[(j, t)],
            });
        }
    }

    // setup linking with the tight per item-period bound
    for j in 0..p {
        for t in 0..t_count {
            constraints.push(LinearConstraint {
                family: Family::SetupLink { item: j, period: t },
                terms: vec![(produce[(j, t)], 1.0), (setup[(j, t)], -params.max_prod[(j, t)])],
                sense: Sense::LessEq,
                rhs: 0.0,
            });
        }
    }

    // hop: stock at t is bounded by the demand of the next `hop` periods
    for j in 0..p {
        for t in hop_periods(t_count, hop) {
            constraints.push(LinearConstraint {
                family: Family::Hop { item: j, period: t },
                terms: vec![(inventory[(j, t)], 1.0)],
                sense: Sense::LessEq,
                rhs: hop_rhs(instance.demand(), j, t, hop),
            });
        }
    }

    let mut objective = Vec::with_capacity(p * (3 * t_count + 1));
    for j in 0..p {
        objective.push((initial_inventory[j], BIG_PENALTY));
        for t in 0..t_count {
            objective.push((setup[(j, t)], instance.setup_cost()[(j, t)]));
            objective.push((produce[(j, t)], instance.unit_prod_cost()[(j, t)]));
            if t < t_count - 1 {
                objective.push((inventory[(j, t)], instance.holding_cost()[(j, t)]));
            }
        }
    }

    debug!(
        variables = table.vars.len(),
        constraints = constraints.len(),
        hop,
        "formulated CLSP model"
    );

    Ok(ClspModel {
        vars: table.vars,
        setup,
        produce,
        inventory,
        initial_inventory,
        constraints,
        objective,
    })
}

impl ClspModel {
    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    pub fn setup_var(&self, item: usize, period: usize) -> VarId {
        self.setup[(item, period)]
    }

    pub fn produce_var(&self, item: usize, period: usize) -> VarId {
        self.produce[(item, period)]
    }

    /// `None` for the last period, which has no inventory variable.
    pub fn inventory_var(&self, item: usize, period: usize) -> Option<VarId> {
        (period < self.inventory.cols()).then(|| self.inventory[(item, period)])
    }

    pub fn initial_inventory_var(&self, item: usize) -> VarId {
        self.initial_inventory[item]
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.iter().map(|(v, c)| c * values[v.0]).sum()
    }

    /// Maps a flat vector of variable values, ordered by [`VarId`], back onto
    /// the item/period layout.
    pub fn assignment(&self, values: &[f64]) -> Assignment {
        let pick = |grid: &Grid<VarId>| Grid::from_fn(grid.rows(), grid.cols(), |j, t| values[grid[(j, t)].0]);
        Assignment {
            setup: pick(&self.setup),
            produce: pick(&self.produce),
            inventory: pick(&self.inventory),
            initial_inventory: self.initial_inventory.iter().map(|v| values[v.0]).collect(),
        }
    }

    /// Inverse of [`ClspModel::assignment`].
    pub fn values(&self, assignment: &Assignment) -> Vec<f64> {
        let mut values = vec![0.0; self.vars.len()];
        for (ids, vals) in [
            (&self.setup, &assignment.setup),
            (&self.produce, &assignment.produce),
            (&self.inventory, &assignment.inventory),
        ] {
            for ((j, t), id) in ids.iter() {
                values[id.0] = vals[(j, t)];
            }
        }
        for (id, v) in self.initial_inventory.iter().zip(&assignment.initial_inventory) {
            values[id.0] = *v;
        }
        values
    }
}
