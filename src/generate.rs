use std::{fs::File, io::Write, path::PathBuf};

use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use rand_distr::{Uniform, Normal, Distribution};
use tracing::info;

use crate::error::{ClspError, Result};
use crate::instance::{InstanceFormat, TrigeiroInstance, TrigeiroItem, TrigeiroPolicy, DEFAULT_HOP_HORIZON};

#[derive(Debug, Args)]
pub struct ClspGenerator {
    /// An optional seed to kickstart the instance generation (drawn at random
    /// and logged when absent)
    #[clap(short='s', long)]
    seed: Option<u64>,
    /// The number of items that must be produced
    #[clap(short='n', long, default_value="8")]
    nb_items: usize,
    /// The number of time periods
    #[clap(short='p', long, default_value="20")]
    nb_periods: usize,
    /// The mean demand of an item in a period
    #[clap(long, default_value="100")]
    mean_demand: f64,
    /// The std deviation of the demand
    #[clap(long, default_value="35")]
    demand_std_dev: f64,
    /// The probability that an item has no demand in a period
    #[clap(long, default_value="0.1")]
    zero_demand: f64,
    /// The minimum setup time
    #[clap(long, default_value="10")]
    min_setup_time: u32,
    /// The maximum setup time
    #[clap(long, default_value="50")]
    max_setup_time: u32,
    /// The minimum setup cost
    #[clap(long, default_value="50")]
    min_setup_cost: u32,
    /// The maximum setup cost
    #[clap(long, default_value="500")]
    max_setup_cost: u32,
    /// The minimum holding cost
    #[clap(long, default_value="1")]
    min_holding_cost: u32,
    /// The maximum holding cost
    #[clap(long, default_value="5")]
    max_holding_cost: u32,
    /// Expected share of the capacity used by demand and one setup per item
    #[clap(short='u', long, default_value="0.85")]
    utilization: f64,
    /// Layout of the generated file
    #[clap(short, long, value_enum, default_value="trigeiro")]
    format: InstanceFormat,
    /// Name of the file where to generate the clsp instance
    #[clap(short, long)]
    output: Option<PathBuf>,
}

impl ClspGenerator {

    pub fn generate(&self) -> Result<()> {
        self.check()?;
        let seed = self.seed.unwrap_or_else(rand::random);
        info!(seed, "seeding the generator");
        let mut rng = ChaChaRng::seed_from_u64(seed);

        let items = self.generate_items(&mut rng);
        let demand = self.generate_demands(&mut rng)?;
        let capacity = self.capacity(&items, &demand);

        let instance = TrigeiroInstance {
            nb_periods: self.nb_periods,
            capacity,
            items,
            demand,
        };
        info!(items = self.nb_items, periods = self.nb_periods, capacity, "generated instance");

        let text = match self.format {
            InstanceFormat::Trigeiro => instance.write(),
            InstanceFormat::Json => {
                let instance = instance.into_instance(TrigeiroPolicy::default(), DEFAULT_HOP_HORIZON.min(self.nb_periods))?;
                serde_json::to_string_pretty(&instance.to_data())?
            }
        };

        if let Some(output) = self.output.as_ref() {
            File::create(output)?.write_all(text.as_bytes())?;
        } else {
            println!("{text}");
        }
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.nb_items == 0 || self.nb_periods == 0 {
            return Err(ClspError::Data("at least one item and one period are needed".into()));
        }
        if !(self.utilization > 0.0 && self.utilization <= 1.0) {
            return Err(ClspError::Data(format!("utilization {} must lie in (0, 1]", self.utilization)));
        }
        if !(0.0..=1.0).contains(&self.zero_demand) {
            return Err(ClspError::Data(format!("zero demand probability {} must lie in [0, 1]", self.zero_demand)));
        }
        if self.min_setup_time > self.max_setup_time
            || self.min_setup_cost > self.max_setup_cost
            || self.min_holding_cost > self.max_holding_cost
        {
            return Err(ClspError::Data("a minimum exceeds its maximum".into()));
        }
        Ok(())
    }

    fn generate_items(&self, rng: &mut impl Rng) -> Vec<TrigeiroItem> {
        let rand_setup_time = Uniform::new_inclusive(self.min_setup_time, self.max_setup_time);
        let rand_setup_cost = Uniform::new_inclusive(self.min_setup_cost, self.max_setup_cost);
        let rand_holding = Uniform::new_inclusive(self.min_holding_cost, self.max_holding_cost);

        (0..self.nb_items)
            .map(|_| TrigeiroItem {
                unit_prod_time: 1.0,
                holding_cost: rand_holding.sample(rng) as f64,
                setup_time: rand_setup_time.sample(rng) as f64,
                setup_cost: rand_setup_cost.sample(rng) as f64,
            })
            .collect()
    }

    fn generate_demands(&self, rng: &mut impl Rng) -> Result<Vec<Vec<f64>>> {
        let rand_demand = Normal::new(self.mean_demand, self.demand_std_dev)
            .map_err(|e| ClspError::Data(format!("cannot create demand distribution: {e}")))?;

        let mut demands = vec![vec![0.0; self.nb_periods]; self.nb_items];
        for row in demands.iter_mut() {
            for d in row.iter_mut() {
                if !rng.gen_bool(self.zero_demand) {
                    *d = rand_demand.sample(rng).round().max(0.0);
                }
            }
        }

        Ok(demands)
    }

    /// Capacity such that the average period load, one setup per item
    /// included, reaches the requested utilization.
    fn capacity(&self, items: &[TrigeiroItem], demand: &[Vec<f64>]) -> f64 {
        let total_demand: f64 = demand.iter().flatten().sum();
        let mean_load = total_demand / self.nb_periods as f64;
        let setup_load: f64 = items.iter().map(|i| i.setup_time).sum();
        ((mean_load + setup_load) / self.utilization).ceil()
    }

}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        generator: ClspGenerator,
    }

    fn generator(args: &[&str]) -> ClspGenerator {
        Wrapper::parse_from(std::iter::once("generate").chain(args.iter().copied())).generator
    }

    #[test]
    fn same_seed_gives_same_instance() {
        let g = generator(&["-s", "42", "-n", "3", "-p", "5"]);
        let a = g.generate_demands(&mut ChaChaRng::seed_from_u64(g.seed.unwrap())).unwrap();
        let b = g.generate_demands(&mut ChaChaRng::seed_from_u64(g.seed.unwrap())).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(a.iter().flatten().all(|d| *d >= 0.0));
    }

    #[test]
    fn capacity_covers_average_load() {
        let g = generator(&["-s", "7", "-n", "4", "-p", "6", "-u", "0.5"]);
        let mut rng = ChaChaRng::seed_from_u64(g.seed.unwrap());
        let items = g.generate_items(&mut rng);
        let demand = g.generate_demands(&mut rng).unwrap();
        let capacity = g.capacity(&items, &demand);
        let mean: f64 = demand.iter().flatten().sum::<f64>() / 6.0;
        assert!(capacity >= 2.0 * mean);
    }

    #[test]
    fn written_instance_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gen.txt");
        let path_arg = path.to_string_lossy().to_string();
        generator(&["-s", "1", "-n", "3", "-p", "8", "-o", &path_arg]).generate().unwrap();
        let instance = crate::instance::ClspInstance::load(&path, InstanceFormat::Trigeiro, TrigeiroPolicy::default()).unwrap();
        assert_eq!(instance.item_count(), 3);
        assert_eq!(instance.period_count(), 8);
    }

    #[test]
    fn bad_utilization_is_rejected() {
        assert!(generator(&["-u", "1.5"]).generate().is_err());
    }
}
