//! Whitespace-delimited Trigeiro benchmark format.
//!
//! ```text
//! <items> <periods>
//! <capacity>
//! <unit prod time> <holding cost> <setup time> <setup cost>   (once per item)
//! <demand>                                                    (periods x items, period-major)
//! ```
//!
//! Item parameters and capacity are the same in every period. The format has
//! no unit production cost column, so that cost is always zero.

use std::{fmt::Write, str::SplitWhitespace};

use crate::error::{ClspError, Result};
use crate::instance::{ClspInstance, InstanceData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrigeiroItem {
    pub unit_prod_time: f64,
    pub holding_cost: f64,
    pub setup_time: f64,
    pub setup_cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrigeiroInstance {
    pub nb_periods: usize,
    pub capacity: f64,
    pub items: Vec<TrigeiroItem>,
    /// `[item][period]`
    pub demand: Vec<Vec<f64>>,
}

/// Where the unit production time of a Trigeiro item comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProdTimePolicy {
    /// Use the value read from the file.
    FromFile,
    /// Ignore the file and use this value for every item and period.
    Override(f64),
}

/// How the quirks of the benchmark files are interpreted.
///
/// The benchmark runs this engine was calibrated on read every unit production
/// time as 1.0 whatever the file says, so that is the default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrigeiroPolicy {
    pub unit_prod_time: ProdTimePolicy,
}

impl Default for TrigeiroPolicy {
    fn default() -> Self {
        TrigeiroPolicy { unit_prod_time: ProdTimePolicy::Override(1.0) }
    }
}

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
    read: usize,
}

impl<'a> Tokens<'a> {
    fn next<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self
            .inner
            .next()
            .ok_or_else(|| ClspError::Data(format!("unexpected end of input after {} values, reading {what}", self.read)))?;
        self.read += 1;
        token
            .parse()
            .map_err(|_| ClspError::Data(format!("value #{} ({token:?}) is not a valid {what}", self.read)))
    }
}

impl TrigeiroInstance {
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = Tokens { inner: text.split_whitespace(), read: 0 };

        let nb_items: usize = tokens.next("item count")?;
        let nb_periods: usize = tokens.next("period count")?;
        if nb_items == 0 || nb_periods == 0 {
            return Err(ClspError::Data(format!(
                "item and period counts must be positive, got {nb_items} x {nb_periods}"
            )));
        }
        let capacity: f64 = tokens.next("capacity")?;

        let mut items = Vec::new();
        for _ in 0..nb_items {
            items.push(TrigeiroItem {
                unit_prod_time: tokens.next("unit production time")?,
                holding_cost: tokens.next("holding cost")?,
                setup_time: tokens.next("setup time")?,
                setup_cost: tokens.next("setup cost")?,
            });
        }

        // grown while reading so a bogus header fails on end of input
        let mut demand: Vec<Vec<f64>> = vec![Vec::new(); nb_items];
        for _ in 0..nb_periods {
            for row in demand.iter_mut() {
                row.push(tokens.next("demand")?);
            }
        }

        Ok(TrigeiroInstance { nb_periods, capacity, items, demand })
    }

    pub fn write(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = writeln!(out, "{} {}", self.items.len(), self.nb_periods);
        let _ = writeln!(out, "{}", self.capacity);
        for item in &self.items {
            let _ = writeln!(
                out,
                "{} {} {} {}",
                item.unit_prod_time, item.holding_cost, item.setup_time, item.setup_cost
            );
        }
        for t in 0..self.nb_periods {
            let line = self.demand.iter().map(|row| row[t].to_string()).collect::<Vec<_>>().join(" ");
            let _ = writeln!(out, "{line}");
        }
        out
    }

    /// Expands the per-item parameters over every period and validates the result.
    pub fn into_instance(self, policy: TrigeiroPolicy, hop_horizon: usize) -> Result<ClspInstance> {
        let nb_items = self.items.len();
        let t = self.nb_periods;
        let unit_prod_time = match policy.unit_prod_time {
            ProdTimePolicy::FromFile => spread(&self.items, t, |i| i.unit_prod_time),
            ProdTimePolicy::Override(value) => vec![vec![value; t]; nb_items],
        };

        let data = InstanceData {
            nb_items,
            nb_periods: t,
            capacity: vec![self.capacity; t],
            unit_prod_cost: vec![vec![0.0; t]; nb_items],
            setup_cost: spread(&self.items, t, |i| i.setup_cost),
            holding_cost: spread(&self.items, t, |i| i.holding_cost),
            setup_time: spread(&self.items, t, |i| i.setup_time),
            unit_prod_time,
            demand: self.demand,
            hop_horizon,
        };
        ClspInstance::try_from(data)
    }
}

/// Repeats one value per item over every period.
fn spread(items: &[TrigeiroItem], periods: usize, value: impl Fn(&TrigeiroItem) -> f64) -> Vec<Vec<f64>> {
    items.iter().map(|item| vec![value(item); periods]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "2 3\n100\n3 2 5 50\n4 1 7 60\n10 20\n11 21\n12 22\n";

    #[test]
    fn demand_is_read_period_major() {
        let parsed = TrigeiroInstance::parse(SMALL).unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.demand, vec![vec![10.0, 11.0, 12.0], vec![20.0, 21.0, 22.0]]);
        assert_eq!(parsed.items[1].setup_cost, 60.0);
    }

    #[test]
    fn default_policy_forces_unit_production_time() {
        let instance = TrigeiroInstance::parse(SMALL).unwrap().into_instance(TrigeiroPolicy::default(), 2).unwrap();
        assert!(instance.unit_prod_time().iter().all(|(_, v)| *v == 1.0));
        assert!(instance.unit_prod_cost().iter().all(|(_, v)| *v == 0.0));
        assert_eq!(instance.setup_time()[(1, 2)], 7.0);
        assert_eq!(instance.capacity(), &[100.0, 100.0, 100.0]);
    }

    #[test]
    fn file_policy_keeps_production_time() {
        let policy = TrigeiroPolicy { unit_prod_time: ProdTimePolicy::FromFile };
        let instance = TrigeiroInstance::parse(SMALL).unwrap().into_instance(policy, 2).unwrap();
        assert_eq!(instance.unit_prod_time()[(0, 0)], 3.0);
        assert_eq!(instance.unit_prod_time()[(1, 2)], 4.0);
    }

    #[test]
    fn truncated_stream_is_a_data_error() {
        let err = TrigeiroInstance::parse("2 3\n100\n3 2 5 50\n4 1 7 60\n10 20\n11").unwrap_err();
        assert!(matches!(err, ClspError::Data(ref m) if m.contains("end of input")));
    }

    #[test]
    fn empty_horizon_is_rejected() {
        assert!(matches!(TrigeiroInstance::parse("3 0\n100\n"), Err(ClspError::Data(_))));
    }

    #[test]
    fn garbage_token_is_a_data_error() {
        assert!(matches!(TrigeiroInstance::parse("2 x"), Err(ClspError::Data(_))));
    }

    #[test]
    fn negative_setup_time_is_rejected_on_conversion() {
        let parsed = TrigeiroInstance::parse("1 1\n10\n1 1 -2 5\n3\n").unwrap();
        assert!(parsed.into_instance(TrigeiroPolicy::default(), 1).is_err());
    }

    #[test]
    fn written_text_parses_back() {
        let parsed = TrigeiroInstance::parse(SMALL).unwrap();
        assert_eq!(TrigeiroInstance::parse(&parsed.write()).unwrap(), parsed);
    }
}
