//! Dispatches a built [`good_lp`] problem to a concrete backend and hands
//! back a type-erased solution, mirroring the host's
//! `MilpOptimizer::solve_lp`, which likewise builds with `coin_cbc` and
//! reports `ResolutionError::Infeasible` as a distinct outcome rather than
//! a generic failure.

use good_lp::{
    Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
};

use crate::error::PlannerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverBackend {
    Cbc,
    MicroLp,
}

/// Object-safe stand-in for [`good_lp::Solution`], which is generic over
/// its own `Self` return types and so cannot be boxed directly.
pub trait ValueReader {
    fn value(&self, variable: Variable) -> f64;
}

impl<S> ValueReader for S
where
    S: Solution + 'static,
{
    fn value(&self, variable: Variable) -> f64 {
        Solution::value(self, variable)
    }
}

pub struct SolveOutcome {
    pub status: String,
    pub objective: f64,
    pub values: Box<dyn ValueReader>,
}

fn map_resolution_error(err: ResolutionError) -> PlannerError {
    match err {
        ResolutionError::Infeasible => PlannerError::SolverInfeasible,
        other => PlannerError::SolverError { status: format!("{other:?}") },
    }
}

pub fn solve(
    vars: ProblemVariables,
    objective: Expression,
    constraints: Vec<Constraint>,
    backend: SolverBackend,
) -> Result<SolveOutcome, PlannerError> {
    match backend {
        SolverBackend::Cbc => {
            let mut model = vars.minimise(objective.clone()).using(good_lp::coin_cbc);
            for c in constraints {
                model = model.with(c);
            }
            let solution = model.solve().map_err(map_resolution_error)?;
            let objective_value = solution.eval(&objective);
            Ok(SolveOutcome {
                status: "optimal".into(),
                objective: objective_value,
                values: Box::new(solution),
            })
        }
        SolverBackend::MicroLp => {
            let mut model = vars.minimise(objective.clone()).using(good_lp::microlp);
            for c in constraints {
                model = model.with(c);
            }
            let solution = model.solve().map_err(map_resolution_error)?;
            let objective_value = solution.eval(&objective);
            Ok(SolveOutcome {
                status: "optimal".into(),
                objective: objective_value,
                values: Box::new(solution),
            })
        }
    }
}
