//! This module defines an abstract representation of a CLSP instance.

use std::{fs::File, io::{BufReader, Read}, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{ClspError, Result};
use crate::grid::Grid;

mod trigeiro;

pub use trigeiro::{ProdTimePolicy, TrigeiroInstance, TrigeiroItem, TrigeiroPolicy};

/// Number of future periods whose demand may justify carried inventory,
/// unless overridden.
pub const DEFAULT_HOP_HORIZON: usize = 6;

fn default_hop_horizon() -> usize {
    DEFAULT_HOP_HORIZON
}

/// Raw, unvalidated instance as found in a JSON instance file. All matrices
/// are indexed `[item][period]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceData {
    pub nb_items: usize,
    pub nb_periods: usize,
    pub capacity: Vec<f64>,
    pub demand: Vec<Vec<f64>>,
    pub unit_prod_cost: Vec<Vec<f64>>,
    pub setup_cost: Vec<Vec<f64>>,
    pub holding_cost: Vec<Vec<f64>>,
    pub unit_prod_time: Vec<Vec<f64>>,
    pub setup_time: Vec<Vec<f64>>,
    #[serde(default = "default_hop_horizon")]
    pub hop_horizon: usize,
}

impl InstanceData {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// A validated CLSP instance. Read-only once built: every stage receives it
/// by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ClspInstance {
    item_count: usize,
    period_count: usize,
    capacity: Vec<f64>,
    demand: Grid<f64>,
    unit_prod_cost: Grid<f64>,
    setup_cost: Grid<f64>,
    holding_cost: Grid<f64>,
    unit_prod_time: Grid<f64>,
    setup_time: Grid<f64>,
    hop_horizon: usize,
}

/// The on-disk layouts an instance can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InstanceFormat {
    Trigeiro,
    Json,
}

impl ClspInstance {
    /// Loads an instance file. The Trigeiro policy is only consulted for the
    /// text format.
    pub fn load(path: impl AsRef<Path>, format: InstanceFormat, policy: TrigeiroPolicy) -> Result<Self> {
        match format {
            InstanceFormat::Json => ClspInstance::try_from(InstanceData::from_json_file(path)?),
            InstanceFormat::Trigeiro => {
                let mut text = String::new();
                File::open(path)?.read_to_string(&mut text)?;
                TrigeiroInstance::parse(&text)?.into_instance(policy, DEFAULT_HOP_HORIZON)
            }
        }
    }

    /// Returns the same instance with another hop horizon.
    pub fn with_hop_horizon(self, hop_horizon: usize) -> Result<Self> {
        if hop_horizon == 0 {
            return Err(ClspError::Data("hop horizon must be positive".into()));
        }
        Ok(ClspInstance { hop_horizon, ..self })
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }
    pub fn period_count(&self) -> usize {
        self.period_count
    }
    pub fn capacity(&self) -> &[f64] {
        &self.capacity
    }
    pub fn demand(&self) -> &Grid<f64> {
        &self.demand
    }
    pub fn unit_prod_cost(&self) -> &Grid<f64> {
        &self.unit_prod_cost
    }
    pub fn setup_cost(&self) -> &Grid<f64> {
        &self.setup_cost
    }
    pub fn holding_cost(&self) -> &Grid<f64> {
        &self.holding_cost
    }
    pub fn unit_prod_time(&self) -> &Grid<f64> {
        &self.unit_prod_time
    }
    pub fn setup_time(&self) -> &Grid<f64> {
        &self.setup_time
    }
    pub fn hop_horizon(&self) -> usize {
        self.hop_horizon
    }

    pub fn total_demand(&self, item: usize) -> f64 {
        self.demand.row(item).iter().sum()
    }

    pub fn to_data(&self) -> InstanceData {
        InstanceData {
            nb_items: self.item_count,
            nb_periods: self.period_count,
            capacity: self.capacity.clone(),
            demand: self.demand.to_rows(),
            unit_prod_cost: self.unit_prod_cost.to_rows(),
            setup_cost: self.setup_cost.to_rows(),
            holding_cost: self.holding_cost.to_rows(),
            unit_prod_time: self.unit_prod_time.to_rows(),
            setup_time: self.setup_time.to_rows(),
            hop_horizon: self.hop_horizon,
        }
    }
}

fn check_values<'a>(name: &str, values: impl IntoIterator<Item = &'a f64>) -> Result<()> {
    for (i, v) in values.into_iter().enumerate() {
        if !v.is_finite() || *v < 0.0 {
            return Err(ClspError::Data(format!("{name}: entry {i} is {v}, expected a finite non-negative value")));
        }
    }
    Ok(())
}

impl TryFrom<InstanceData> for ClspInstance {
    type Error = ClspError;

    fn try_from(data: InstanceData) -> Result<Self> {
        let (p, t) = (data.nb_items, data.nb_periods);
        if p == 0 || t == 0 {
            return Err(ClspError::Data(format!("item and period counts must be positive, got {p} x {t}")));
        }
        if data.hop_horizon == 0 {
            return Err(ClspError::Data("hop horizon must be positive".into()));
        }
        if data.capacity.len() != t {
            return Err(ClspError::Data(format!(
                "capacity: expected {t} periods, found {}",
                data.capacity.len()
            )));
        }
        check_values("capacity", &data.capacity)?;

        let grid = |name: &str, rows: Vec<Vec<f64>>| -> Result<Grid<f64>> {
            let g = Grid::from_rows(name, p, t, rows)?;
            check_values(name, g.iter().map(|(_, v)| v))?;
            Ok(g)
        };

        Ok(ClspInstance {
            item_count: p,
            period_count: t,
            demand: grid("demand", data.demand)?,
            unit_prod_cost: grid("unit_prod_cost", data.unit_prod_cost)?,
            setup_cost: grid("setup_cost", data.setup_cost)?,
            holding_cost: grid("holding_cost", data.holding_cost)?,
            unit_prod_time: grid("unit_prod_time", data.unit_prod_time)?,
            setup_time: grid("setup_time", data.setup_time)?,
            capacity: data.capacity,
            hop_horizon: data.hop_horizon,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two symmetric items over three periods, capacity 100.
    pub(crate) fn two_by_three() -> InstanceData {
        InstanceData {
            nb_items: 2,
            nb_periods: 3,
            capacity: vec![100.0; 3],
            demand: vec![vec![10.0; 3]; 2],
            unit_prod_cost: vec![vec![0.0; 3]; 2],
            setup_cost: vec![vec![50.0; 3]; 2],
            holding_cost: vec![vec![2.0; 3]; 2],
            unit_prod_time: vec![vec![1.0; 3]; 2],
            setup_time: vec![vec![5.0; 3]; 2],
            hop_horizon: 3,
        }
    }

    #[test]
    fn valid_data_builds_an_instance() {
        let instance = ClspInstance::try_from(two_by_three()).unwrap();
        assert_eq!(instance.item_count(), 2);
        assert_eq!(instance.period_count(), 3);
        assert_eq!(instance.total_demand(1), 30.0);
        assert_eq!(instance.to_data().demand, two_by_three().demand);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let mut data = two_by_three();
        data.nb_periods = 0;
        assert!(matches!(ClspInstance::try_from(data), Err(ClspError::Data(_))));
    }

    #[test]
    fn negative_cost_is_rejected() {
        let mut data = two_by_three();
        data.holding_cost[1][2] = -1.0;
        let err = ClspInstance::try_from(data).unwrap_err();
        assert!(err.to_string().contains("holding_cost"));
    }

    #[test]
    fn capacity_length_must_match_periods() {
        let mut data = two_by_three();
        data.capacity.pop();
        assert!(matches!(ClspInstance::try_from(data), Err(ClspError::Data(_))));
    }

    #[test]
    fn hop_override_keeps_everything_else() {
        let instance = ClspInstance::try_from(two_by_three()).unwrap();
        let other = instance.clone().with_hop_horizon(1).unwrap();
        assert_eq!(other.hop_horizon(), 1);
        assert_eq!(other.demand(), instance.demand());
        assert!(instance.with_hop_horizon(0).is_err());
    }

    #[test]
    fn json_hop_defaults_when_missing() {
        let mut value = serde_json::to_value(two_by_three()).unwrap();
        value.as_object_mut().unwrap().remove("hop_horizon");
        let data: InstanceData = serde_json::from_value(value).unwrap();
        assert_eq!(data.hop_horizon, DEFAULT_HOP_HORIZON);
    }
}
