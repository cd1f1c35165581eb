//! Secondary parameters derived from an instance.

use std::ops::Range;

use crate::error::{ClspError, Result};
use crate::grid::Grid;
use crate::instance::ClspInstance;

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedParams {
    /// Largest quantity of item `j` that fits period `t` on its own, after the
    /// setup time is paid. Negative when the setup alone exceeds capacity.
    pub max_prod: Grid<f64>,
}

impl DerivedParams {
    pub fn derive(instance: &ClspInstance) -> Result<Self> {
        let (p, t) = (instance.item_count(), instance.period_count());
        let a = instance.unit_prod_time();
        if let Some(((j, k), _)) = a.iter().find(|(_, v)| **v == 0.0) {
            return Err(ClspError::Data(format!(
                "unit production time of item {j} in period {k} is zero, production bound is undefined"
            )));
        }

        let max_prod = Grid::from_fn(p, t, |j, k| {
            (instance.capacity()[k] - instance.setup_time()[(j, k)]) / a[(j, k)]
        });
        Ok(DerivedParams { max_prod })
    }
}

/// Sum of the demand of `item` over the `hop` periods following `period`.
/// Periods past the horizon contribute nothing.
pub fn hop_rhs(demand: &Grid<f64>, item: usize, period: usize, hop: usize) -> f64 {
    let first = period + 1;
    let last = (period + hop).min(demand.cols() - 1);
    if first > last {
        return 0.0;
    }
    demand.row(item)[first..=last].iter().sum()
}

/// Periods whose ending inventory is bounded by the hop rule: `t ≤ T − hop`,
/// restricted to periods that carry an inventory variable (`t ≤ T − 2`).
pub fn hop_periods(period_count: usize, hop: usize) -> Range<usize> {
    if hop == 0 || hop > period_count || period_count < 2 {
        return 0..0;
    }
    0..(period_count - hop).min(period_count - 2) + 1
}
