//! The dual-mesh adaptive solution loop.
//!
//! Each adaptivity step solves the nonlinear problem on a reference space obtained by global
//! refinement of the coarse space, estimates the error of the coarse solution against the
//! reference solution, and refines the coarse space where the error is largest. The loop ends
//! when the estimated relative error drops below the requested tolerance, or when an optional
//! step budget is used up.
use crate::adapt::{adapt, AdaptMode, AdaptSettings};
use crate::assembly::{DiscreteProblem, SpaceSystem};
use crate::convergence::{ConvergenceTracker, Stopwatch};
use crate::error::{estimate_error, exact_relative_error, Norm};
use crate::linear_solver::SparseLuSolver;
use crate::optimize::newton::{newton, NewtonError, NewtonSettings};
use crate::optimize::system::LinearSolver;
use crate::problems::ExactSolution;
use crate::projection::{project_global, ProjectionError};
use crate::space::{BoundaryConditions, Space, SpaceError};
use crate::weak_form::WeakForm;
use log::info;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::f64::consts::PI;
use std::fmt;
use std::fmt::Display;

/// Parameters of an adaptive run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptivityConfig {
    pub domain: [f64; 2],
    pub num_elements: usize,
    pub initial_degree: usize,
    pub boundary_conditions: BoundaryConditions,
    pub newton_tolerance_coarse: f64,
    pub newton_tolerance_reference: f64,
    pub newton_max_iterations: usize,
    pub adapt_mode: AdaptMode,
    /// Elements with error above `threshold * max error` are refined.
    pub threshold: f64,
    /// The run stops once the estimated relative error (in percent) is below this value.
    pub tolerance_percent: f64,
    pub norm: Norm,
    pub max_degree: usize,
    /// Maximum number of adaptivity steps, unlimited if `None`.
    pub max_steps: Option<usize>,
}

impl Default for AdaptivityConfig {
    fn default() -> Self {
        Self {
            domain: [0.0, 2.0 * PI],
            num_elements: 3,
            initial_degree: 1,
            boundary_conditions: BoundaryConditions::none(),
            newton_tolerance_coarse: 1e-6,
            newton_tolerance_reference: 1e-6,
            newton_max_iterations: 150,
            adapt_mode: AdaptMode::Hp,
            threshold: 0.7,
            tolerance_percent: 1e-1,
            norm: Norm::H1,
            max_degree: 10,
            max_steps: None,
        }
    }
}

impl AdaptivityConfig {
    pub fn with_boundary_conditions(mut self, boundary_conditions: BoundaryConditions) -> Self {
        self.boundary_conditions = boundary_conditions;
        self
    }

    /// Uses `boundary_conditions` only if the configuration prescribes none.
    pub fn or_boundary_conditions(mut self, boundary_conditions: BoundaryConditions) -> Self {
        if self.boundary_conditions == BoundaryConditions::none() {
            self.boundary_conditions = boundary_conditions;
        }
        self
    }

    pub fn adapt_settings(&self) -> AdaptSettings {
        AdaptSettings {
            mode: self.adapt_mode,
            threshold: self.threshold,
            norm: self.norm,
            max_degree: self.max_degree,
        }
    }

    pub fn coarse_newton_settings(&self) -> NewtonSettings<f64> {
        NewtonSettings {
            max_iterations: self.newton_max_iterations,
            tolerance: self.newton_tolerance_coarse,
        }
    }

    pub fn reference_newton_settings(&self) -> NewtonSettings<f64> {
        NewtonSettings {
            max_iterations: self.newton_max_iterations,
            tolerance: self.newton_tolerance_reference,
        }
    }
}

#[derive(Debug)]
pub enum AdaptivityError {
    /// The initial coarse space could not be constructed from the configuration.
    InvalidSpace(SpaceError),
    /// Newton's method failed on the initial coarse space.
    CoarseSolve(NewtonError),
    /// Newton's method failed on the reference space of the given step.
    FineSolve { step: usize, source: NewtonError },
    /// The reference solution could not be projected onto the coarse space.
    Projection { step: usize, source: ProjectionError },
}

impl AdaptivityError {
    /// The Newton failure behind this error, if any.
    pub fn newton_error(&self) -> Option<&NewtonError> {
        match self {
            Self::CoarseSolve(error) => Some(error),
            Self::FineSolve { source, .. } => Some(source),
            Self::InvalidSpace(_) | Self::Projection { .. } => None,
        }
    }

    pub fn is_newton_divergence(&self) -> bool {
        self.newton_error().map_or(false, NewtonError::is_divergence)
    }

    pub fn is_linear_solve_failure(&self) -> bool {
        self.newton_error()
            .map_or(false, NewtonError::is_linear_solve_failure)
    }
}

impl Display for AdaptivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpace(error) => write!(f, "Invalid initial space: {}", error),
            Self::CoarseSolve(error) => write!(f, "Newton solve on the coarse mesh failed: {}", error),
            Self::FineSolve { step, source } => {
                write!(f, "Newton solve on the reference mesh failed in step {}: {}", step, source)
            }
            Self::Projection { step, source } => write!(f, "Projection failed in step {}: {}", step, source),
        }
    }
}

impl Error for AdaptivityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSpace(error) => Some(error),
            Self::CoarseSolve(error) => Some(error),
            Self::FineSolve { source, .. } => Some(source),
            Self::Projection { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The estimated relative error dropped below the tolerance.
    ToleranceMet,
    /// The configured maximum number of steps was reached.
    StepBudgetExhausted,
    /// No selected element admitted a refinement, e.g. because all of them had reached the
    /// maximum degree.
    RefinementExhausted,
}

/// Summary of a single adaptivity step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: usize,
    pub num_elements: usize,
    pub coarse_dofs: usize,
    pub reference_dofs: usize,
    pub reference_newton_iterations: usize,
    pub estimated_error_percent: f64,
    pub exact_error_percent: Option<f64>,
    /// Elements refined at the end of the step (zero for the final step).
    pub refined_elements: usize,
    /// Accumulated CPU time at the time of the estimate.
    pub cpu_seconds: f64,
}

#[derive(Debug, Clone)]
pub struct AdaptivityOutcome {
    /// The final coarse space, holding the final solution.
    pub space: Space,
    pub tracker: ConvergenceTracker,
    pub steps: Vec<StepReport>,
    pub stop_reason: StopReason,
}

impl AdaptivityOutcome {
    pub fn num_dofs(&self) -> usize {
        self.space.num_dofs()
    }

    /// Whether the final number of DOFs is at most `max_dofs`.
    pub fn within_dof_budget(&self, max_dofs: usize) -> bool {
        self.num_dofs() <= max_dofs
    }

    pub fn final_estimated_error_percent(&self) -> Option<f64> {
        self.steps.last().map(|step| step.estimated_error_percent)
    }

    pub fn final_exact_error_percent(&self) -> Option<f64> {
        self.steps.last().and_then(|step| step.exact_error_percent)
    }
}

/// Drives the adaptive solution of the problem given by a [`WeakForm`].
pub struct AdaptiveLoop<'a> {
    config: AdaptivityConfig,
    weak_form: &'a WeakForm,
    exact_solution: Option<Box<dyn ExactSolution + 'a>>,
    linear_solver: Box<dyn LinearSolver<f64, CsrMatrix<f64>> + 'a>,
}

impl<'a> fmt::Debug for AdaptiveLoop<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveLoop")
            .field("config", &self.config)
            .field("weak_form", &self.weak_form)
            .field("has_exact_solution", &self.exact_solution.is_some())
            .finish()
    }
}

impl<'a> AdaptiveLoop<'a> {
    pub fn new(config: AdaptivityConfig, weak_form: &'a WeakForm) -> Self {
        Self {
            config,
            weak_form,
            exact_solution: None,
            linear_solver: Box::new(SparseLuSolver::new()),
        }
    }

    /// Additionally reports the error against a known solution. The exact error is never used
    /// to make refinement decisions.
    pub fn with_exact_solution(mut self, exact_solution: impl ExactSolution + 'a) -> Self {
        self.exact_solution = Some(Box::new(exact_solution));
        self
    }

    /// Replaces the linear solver used by Newton's method and by projections, which defaults to
    /// [`SparseLuSolver`].
    pub fn with_linear_solver(mut self, linear_solver: impl LinearSolver<f64, CsrMatrix<f64>> + 'a) -> Self {
        self.linear_solver = Box::new(linear_solver);
        self
    }

    pub fn config(&self) -> &AdaptivityConfig {
        &self.config
    }

    pub fn run(&mut self) -> Result<AdaptivityOutcome, AdaptivityError> {
        let mut stopwatch = Stopwatch::new();
        stopwatch.start();

        let config = &self.config;
        let mut coarse = Space::new(
            config.domain,
            config.num_elements,
            config.initial_degree,
            self.weak_form.num_equations(),
            &config.boundary_conditions,
        )
        .map_err(AdaptivityError::InvalidSpace)?;
        let problem = DiscreteProblem::new(self.weak_form);

        info!("Solving on coarse mesh ({} DOFs):", coarse.num_dofs());
        let result = newton(
            &mut SpaceSystem::new(&mut coarse, &problem),
            &mut self.linear_solver,
            &config.coarse_newton_settings(),
        )
        .map_err(AdaptivityError::CoarseSolve)?;
        info!(
            "Finished initial coarse mesh Newton iteration ({} iterations, residual {:e}).",
            result.iterations, result.residual_norm
        );

        let mut tracker = ConvergenceTracker::new();
        let mut steps = Vec::new();
        let mut stop_reason = None;
        while stop_reason.is_none() {
            let step = steps.len() + 1;
            let (report, reason) = self.step(step, &mut coarse, &problem, &mut tracker, &mut stopwatch)?;
            steps.push(report);
            stop_reason = reason;
        }
        stopwatch.stop();

        let stop_reason = stop_reason.unwrap_or(StopReason::StepBudgetExhausted);
        info!(
            "Adaptivity finished after {} steps ({:?}): {} DOFs, {:.3} s.",
            steps.len(),
            stop_reason,
            coarse.num_dofs(),
            stopwatch.accumulated_seconds()
        );

        Ok(AdaptivityOutcome {
            space: coarse,
            tracker,
            steps,
            stop_reason,
        })
    }

    /// Performs one adaptivity step. The reference space and everything assembled on it live
    /// only for the duration of this call.
    fn step(
        &mut self,
        step: usize,
        coarse: &mut Space,
        problem: &DiscreteProblem,
        tracker: &mut ConvergenceTracker,
        stopwatch: &mut Stopwatch,
    ) -> Result<(StepReport, Option<StopReason>), AdaptivityError> {
        info!("---- Adaptivity step {}:", step);

        let mut reference = coarse.refine_globally();
        info!("Solving on reference mesh ({} DOFs):", reference.num_dofs());
        let result = newton(
            &mut SpaceSystem::new(&mut reference, problem),
            &mut self.linear_solver,
            &self.config.reference_newton_settings(),
        )
        .map_err(|source| AdaptivityError::FineSolve { step, source })?;
        info!(
            "Finished reference mesh Newton iteration ({} iterations, residual {:e}).",
            result.iterations, result.residual_norm
        );

        // In the first step the coarse solution comes from the coarse Newton solve. Later
        // steps replace it by the projection of the current reference solution
        if step > 1 {
            project_global(self.config.norm, coarse, &reference, &mut self.linear_solver)
                .map_err(|source| AdaptivityError::Projection { step, source })?;
        }

        let estimate = estimate_error(self.config.norm, coarse, &reference);
        let estimated_percent = estimate.relative_error_percent();
        let cpu_seconds = stopwatch.accumulated_seconds();
        info!("Max element error: {:e}", estimate.max_element_error());
        info!(
            "Relative error (est) = {} % ({} coarse DOFs, {} reference DOFs)",
            estimated_percent,
            coarse.num_dofs(),
            reference.num_dofs()
        );
        tracker.record_estimated(coarse.num_dofs(), cpu_seconds, estimated_percent);

        let exact_percent = match &self.exact_solution {
            Some(exact) => {
                stopwatch.stop();
                let percent = 100.0 * exact_relative_error(self.config.norm, coarse, exact.as_ref());
                stopwatch.start();
                info!("Relative error (exact) = {} %", percent);
                tracker.record_exact(coarse.num_dofs(), cpu_seconds, percent);
                Some(percent)
            }
            None => None,
        };

        let mut report = StepReport {
            step,
            num_elements: coarse.num_elements(),
            coarse_dofs: coarse.num_dofs(),
            reference_dofs: reference.num_dofs(),
            reference_newton_iterations: result.iterations,
            estimated_error_percent: estimated_percent,
            exact_error_percent: exact_percent,
            refined_elements: 0,
            cpu_seconds,
        };

        if estimated_percent < self.config.tolerance_percent {
            info!("Estimated error below tolerance {} %.", self.config.tolerance_percent);
            return Ok((report, Some(StopReason::ToleranceMet)));
        }
        if self.config.max_steps.map_or(false, |max_steps| step >= max_steps) {
            info!("Reached the maximum number of adaptivity steps.");
            return Ok((report, Some(StopReason::StepBudgetExhausted)));
        }

        report.refined_elements = adapt(
            &self.config.adapt_settings(),
            &estimate.element_errors,
            coarse,
            &reference,
        );
        if report.refined_elements == 0 {
            return Ok((report, Some(StopReason::RefinementExhausted)));
        }
        Ok((report, None))
    }
}
