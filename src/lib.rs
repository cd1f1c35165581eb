//! Capacitated lot-sizing with setups (CLSP) and a hop limit on carried
//! inventory: instance model, MIP formulation, solver boundary and an
//! independent verifier for the plans that come back.

pub mod error;
pub mod generate;
pub mod grid;
pub mod instance;
pub mod model;
pub mod params;
pub mod report;
pub mod resolution;
pub mod verify;

pub use error::{ClspError, Result, SolverFailure};
pub use instance::ClspInstance;
pub use model::{formulate, Assignment, ClspModel};
