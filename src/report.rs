//! Console tables and the aggregated results file.

use std::{fmt, fs::OpenOptions, path::Path};

use serde::Serialize;

use crate::error::Result;
use crate::instance::ClspInstance;
use crate::model::Assignment;
use crate::verify::VerificationReport;

/// Values below this are printed as zero.
const DISPLAY_EPSILON: f64 = 1e-4;

fn cell(value: f64) -> String {
    if value.abs() < DISPLAY_EPSILON {
        "0".to_string()
    } else if (value - value.round()).abs() < DISPLAY_EPSILON {
        format!("{}", value.round())
    } else {
        format!("{value:.2}")
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, label: &str, values: Vec<f64>) -> fmt::Result {
    write!(f, "{label:>10}")?;
    for v in values {
        write!(f, "{:>7}", cell(v))?;
    }
    writeln!(f)
}

/// Demand, setups, production and stock of every item, one column per period.
pub struct PlanTable<'a> {
    pub instance: &'a ClspInstance,
    pub assignment: &'a Assignment,
}

impl fmt::Display for PlanTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t_count = self.instance.period_count();
        write!(f, "{:>10}", "t")?;
        for t in 0..t_count {
            write!(f, "{:>7}", t + 1)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", "=".repeat(10 + 7 * t_count))?;

        for j in 0..self.instance.item_count() {
            let demand = self.instance.demand().row(j).to_vec();
            let setup = self.assignment.setup.row(j).iter().map(|v| v.round()).collect();
            let produce = self.assignment.produce.row(j).to_vec();
            let stock = (0..t_count).map(|t| self.assignment.ending_inventory(j, t)).collect();
            write_row(f, "demand", demand)?;
            write_row(f, &format!("({}) setup", j + 1), setup)?;
            write_row(f, "produce", produce)?;
            write_row(f, "stock", stock)?;
            writeln!(f, "{:>10}{:>7}", "initial", cell(self.assignment.initial_inventory[j]))?;
            writeln!(f, "{}", "-".repeat(10 + 7 * t_count))?;
        }
        Ok(())
    }
}

/// Recomputed usage against capacity, one line per period.
pub struct CapacityTable<'a>(pub &'a VerificationReport);

impl fmt::Display for CapacityTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for u in &self.0.usage {
            writeln!(f, "t = {:>3} :: {:>9}/{:>9}", u.period + 1, cell(u.used), cell(u.capacity))?;
        }
        writeln!(f, "z verified = {}", cell(self.0.setup_and_holding_cost()))?;
        writeln!(f, "z total    = {}", cell(self.0.cost.total()))
    }
}

/// One line of the results file, kept for later aggregation across runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub items: usize,
    pub periods: usize,
    pub hop: usize,
    pub objective: f64,
    pub elapsed_secs: f64,
}

impl ResultRecord {
    /// Appends the record as a tab-separated line, creating the file if needed.
    pub fn append_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').has_headers(false).from_writer(file);
        writer.serialize(self)?;
        writer.flush()?;
        Ok(())
    }
}
