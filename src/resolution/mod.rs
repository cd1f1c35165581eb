//! Solving a formulated model and checking what comes back.

pub mod adapter;
pub mod solve;

pub use adapter::{MicroLpSolver, MipSolver, SolveOutcome, SolverConfig};
pub use solve::{solve_instance, Solve, Solved};
