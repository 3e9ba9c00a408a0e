//! MILP formulation: variables and constraints (`builder`), the objective
//! assembly (`objective`), the solver adapter (`solver`), and the tuning
//! constants shared by both (`weights`).
//!
//! Grounded in the host's `optimizer::strategies::milp::MilpOptimizer`,
//! generalized from a single-battery 24h schedule to the full grid /
//! multi-inverter / multi-battery / multi-EV topology this planner covers.

pub mod builder;
pub mod objective;
pub mod solver;
pub mod weights;

pub use builder::{build, MilpModel};
pub use objective::build_objective;
pub use solver::{solve, SolveOutcome, SolverBackend};
pub use weights::ObjectiveWeights;
