use hpadapt::adapt::AdaptMode;
use hpadapt::adaptivity::{AdaptiveLoop, AdaptivityConfig, AdaptivityError, StopReason};
use hpadapt::linear_solver::SparseLuSolver;
use hpadapt::optimize::newton::NewtonError;
use hpadapt::optimize::system::LinearSolver;
use hpadapt::problems::{HarmonicSystem, RiccatiDecay};
use hpadapt::space::{BoundaryConditions, DirichletBc, SpaceError};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use std::error::Error;

fn harmonic_config(mode: AdaptMode) -> AdaptivityConfig {
    AdaptivityConfig {
        adapt_mode: mode,
        ..AdaptivityConfig::default().with_boundary_conditions(HarmonicSystem::default().boundary_conditions())
    }
}

#[test]
fn hp_adaptivity_on_harmonic_system() {
    let problem = HarmonicSystem::default();
    let weak_form = problem.weak_form();
    let outcome = AdaptiveLoop::new(harmonic_config(AdaptMode::Hp), &weak_form)
        .with_exact_solution(problem)
        .run()
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::ToleranceMet);
    assert!(outcome.within_dof_budget(40), "{} DOFs", outcome.num_dofs());
    assert!(outcome.final_estimated_error_percent().unwrap() < 0.1);
    assert!(outcome.final_exact_error_percent().unwrap() <= 0.1);

    // Initial mesh: 3 linear elements, 2 components, both prescribed on the left
    let first = &outcome.steps[0];
    assert_eq!(first.step, 1);
    assert_eq!(first.coarse_dofs, 6);
    assert!(first.estimated_error_percent > 50.0);
    assert!(outcome.steps.last().unwrap().refined_elements == 0);

    let num_steps = outcome.steps.len();
    assert!(num_steps > 2);
    assert_eq!(outcome.tracker.dof_estimated.len(), num_steps);
    assert_eq!(outcome.tracker.cpu_estimated.len(), num_steps);
    assert_eq!(outcome.tracker.dof_exact.len(), num_steps);
    assert!(outcome.tracker.has_exact());
    assert_eq!(outcome.tracker.dof_estimated.last().unwrap().0, outcome.num_dofs() as f64);

    // CPU time never decreases between steps
    let times: Vec<_> = outcome.steps.iter().map(|step| step.cpu_seconds).collect();
    assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn p_adaptivity_raises_all_degrees() {
    let weak_form = HarmonicSystem::default().weak_form();
    let outcome = AdaptiveLoop::new(harmonic_config(AdaptMode::P), &weak_form)
        .run()
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::ToleranceMet);
    assert_eq!(outcome.space.num_elements(), 3);
    assert!(outcome.space.degrees().iter().all(|&p| p > 1));
    assert!(outcome.within_dof_budget(40));
    // Without an exact solution, only the estimated series is recorded
    assert!(!outcome.tracker.has_exact());
    assert!(outcome.final_exact_error_percent().is_none());
}

#[test]
fn h_adaptivity_stops_at_step_budget() {
    let weak_form = HarmonicSystem::default().weak_form();
    let config = AdaptivityConfig {
        max_steps: Some(2),
        ..harmonic_config(AdaptMode::H)
    };
    let outcome = AdaptiveLoop::new(config, &weak_form).run().unwrap();

    assert_eq!(outcome.stop_reason, StopReason::StepBudgetExhausted);
    assert_eq!(outcome.steps.len(), 2);
    assert!(outcome.steps[0].refined_elements > 0);
    assert_eq!(outcome.steps[1].refined_elements, 0);
    assert!(outcome.steps[1].coarse_dofs > outcome.steps[0].coarse_dofs);
    assert!(outcome.steps[1].num_elements > 3);
    // h-refinement keeps the initial degree
    assert!(outcome.space.degrees().iter().all(|&p| p == 1));
    assert!(outcome.steps[1].estimated_error_percent < outcome.steps[0].estimated_error_percent);
}

#[test]
fn riccati_adaptivity_reduces_error() {
    let problem = RiccatiDecay::default();
    let weak_form = problem.weak_form();
    let config = AdaptivityConfig {
        domain: [0.0, 2.0],
        boundary_conditions: problem.boundary_conditions(),
        tolerance_percent: 1e-2,
        max_steps: Some(8),
        ..AdaptivityConfig::default()
    };
    let outcome = AdaptiveLoop::new(config, &weak_form)
        .with_exact_solution(problem)
        .run()
        .unwrap();

    assert!(matches!(
        outcome.stop_reason,
        StopReason::ToleranceMet | StopReason::StepBudgetExhausted
    ));
    let first = outcome.steps.first().unwrap();
    let last = outcome.steps.last().unwrap();
    assert!(last.exact_error_percent.unwrap() < first.exact_error_percent.unwrap());
    assert!(last.estimated_error_percent < first.estimated_error_percent);
    assert!(outcome.steps.iter().all(|step| step.reference_newton_iterations >= 2));
}

#[test]
fn zero_newton_iterations_diverge_on_coarse_mesh() {
    let problem = RiccatiDecay::default();
    let weak_form = problem.weak_form();
    let config = AdaptivityConfig {
        domain: [0.0, 2.0],
        boundary_conditions: problem.boundary_conditions(),
        newton_max_iterations: 0,
        ..AdaptivityConfig::default()
    };
    let error = AdaptiveLoop::new(config, &weak_form).run().unwrap_err();

    assert!(error.is_newton_divergence());
    assert!(!error.is_linear_solve_failure());
    assert!(matches!(
        error,
        AdaptivityError::CoarseSolve(NewtonError::Divergence { iterations: 1 })
    ));
    assert!(error.source().is_some());
}

struct RejectingSolver;

impl LinearSolver<f64, CsrMatrix<f64>> for RejectingSolver {
    fn solve(&mut self, _: &CsrMatrix<f64>, _: &DVector<f64>) -> Result<DVector<f64>, Box<dyn Error + Send + Sync>> {
        Err("matrix rejected".into())
    }
}

#[test]
fn linear_solver_failure_is_reported() {
    let weak_form = HarmonicSystem::default().weak_form();
    let error = AdaptiveLoop::new(harmonic_config(AdaptMode::Hp), &weak_form)
        .with_linear_solver(RejectingSolver)
        .run()
        .unwrap_err();

    assert!(error.is_linear_solve_failure());
    assert!(!error.is_newton_divergence());
    match error.newton_error() {
        Some(NewtonError::LinearSolveFailure { iteration, source }) => {
            assert_eq!(*iteration, 1);
            assert_eq!(source.to_string(), "matrix rejected");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(error.to_string().contains("coarse mesh"));
}

/// Delegates to a sparse LU solver, but fails on the given call.
struct FailingOnCall {
    calls: usize,
    fail_on: usize,
}

impl FailingOnCall {
    fn new(fail_on: usize) -> Self {
        Self { calls: 0, fail_on }
    }
}

impl LinearSolver<f64, CsrMatrix<f64>> for FailingOnCall {
    fn solve(
        &mut self,
        matrix: &CsrMatrix<f64>,
        rhs: &DVector<f64>,
    ) -> Result<DVector<f64>, Box<dyn Error + Send + Sync>> {
        self.calls += 1;
        if self.calls == self.fail_on {
            return Err(format!("failed on call {}", self.calls).into());
        }
        SparseLuSolver::new().solve(matrix, rhs)
    }
}

// The harmonic system is linear, so every Newton run takes a single linear solve. The solves
// happen in the order: coarse mesh, step 1 reference mesh, step 2 reference mesh, step 2
// projection.

#[test]
fn reference_solve_failure_reports_step() {
    let weak_form = HarmonicSystem::default().weak_form();
    let error = AdaptiveLoop::new(harmonic_config(AdaptMode::Hp), &weak_form)
        .with_linear_solver(FailingOnCall::new(2))
        .run()
        .unwrap_err();

    assert!(error.is_linear_solve_failure());
    match &error {
        AdaptivityError::FineSolve {
            step,
            source: NewtonError::LinearSolveFailure { iteration, source },
        } => {
            assert_eq!(*step, 1);
            assert_eq!(*iteration, 1);
            assert_eq!(source.to_string(), "failed on call 2");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(error.to_string().contains("reference mesh"));
}

#[test]
fn projection_failure_reports_step() {
    let weak_form = HarmonicSystem::default().weak_form();
    let error = AdaptiveLoop::new(harmonic_config(AdaptMode::Hp), &weak_form)
        .with_linear_solver(FailingOnCall::new(4))
        .run()
        .unwrap_err();

    assert!(matches!(error, AdaptivityError::Projection { step: 2, .. }));
    assert!(error.newton_error().is_none());
    assert!(!error.is_linear_solve_failure());
    assert!(!error.is_newton_divergence());
    let source = error.source().unwrap();
    assert_eq!(source.source().unwrap().to_string(), "failed on call 4");
    assert!(error.to_string().contains("step 2"));
}

#[test]
fn p_adaptivity_stops_at_degree_cap() {
    let weak_form = HarmonicSystem::default().weak_form();
    let config = AdaptivityConfig {
        max_degree: 1,
        ..harmonic_config(AdaptMode::P)
    };
    let outcome = AdaptiveLoop::new(config, &weak_form).run().unwrap();

    assert_eq!(outcome.stop_reason, StopReason::RefinementExhausted);
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.steps[0].refined_elements, 0);
    assert!(outcome.steps[0].estimated_error_percent > 50.0);
    assert!(outcome.space.degrees().iter().all(|&p| p == 1));
}

#[test]
fn invalid_configuration_is_rejected() {
    let weak_form = HarmonicSystem::default().weak_form();
    let config = AdaptivityConfig {
        num_elements: 0,
        ..harmonic_config(AdaptMode::Hp)
    };
    let error = AdaptiveLoop::new(config, &weak_form).run().unwrap_err();
    assert!(matches!(error, AdaptivityError::InvalidSpace(SpaceError::NoElements)));

    let config = AdaptivityConfig {
        domain: [1.0, 1.0],
        ..harmonic_config(AdaptMode::Hp)
    };
    let error = AdaptiveLoop::new(config, &weak_form).run().unwrap_err();
    assert!(matches!(error, AdaptivityError::InvalidSpace(SpaceError::InvalidDomain { .. })));
}

#[test]
fn config_round_trips_through_json() {
    let config = AdaptivityConfig {
        domain: [0.0, 6.0],
        max_steps: Some(4),
        ..harmonic_config(AdaptMode::H)
    };
    let json = serde_json::to_string(&config).unwrap();
    let parsed: AdaptivityConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);

    // Missing fields fall back to the defaults
    let parsed: AdaptivityConfig = serde_json::from_str(r#"{ "adapt_mode": "P", "threshold": 0.5 }"#).unwrap();
    assert_eq!(parsed.adapt_mode, AdaptMode::P);
    assert_eq!(parsed.threshold, 0.5);
    assert_eq!(parsed.num_elements, AdaptivityConfig::default().num_elements);
}

#[test]
fn config_without_boundary_conditions_takes_problem_defaults() {
    let problem = HarmonicSystem::default();
    let parsed: AdaptivityConfig = serde_json::from_str(r#"{ "adapt_mode": "H" }"#).unwrap();
    assert_eq!(parsed.boundary_conditions, BoundaryConditions::none());
    let config = parsed.or_boundary_conditions(problem.boundary_conditions());
    assert_eq!(config.boundary_conditions, problem.boundary_conditions());
    assert_eq!(config.adapt_mode, AdaptMode::H);

    // Boundary conditions given in the configuration are kept
    let custom = BoundaryConditions::none().with_left(DirichletBc::new(1, 2.0));
    let config = AdaptivityConfig::default()
        .with_boundary_conditions(custom.clone())
        .or_boundary_conditions(problem.boundary_conditions());
    assert_eq!(config.boundary_conditions, custom);
}
