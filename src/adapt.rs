//! Selection of elements to refine, and of how to refine them.
//!
//! Elements are selected with a threshold strategy on the estimated element errors. For each
//! selected element, a list of candidate refinements is compared by how well they can
//! represent the reference solution: the error of the projection-based interpolant of the
//! reference solution onto each candidate is computed, and the candidate with the largest
//! error decrease (on a logarithmic scale) per added DOF is chosen.
use crate::error::{element_error_squared, Norm};
use crate::projection::interpolate_element;
use crate::space::{Element, ElementRefinement, Space};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Smallest interpolation error considered when scoring, avoiding `ln(0)`.
const MIN_CANDIDATE_ERROR: f64 = 1e-150;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdaptMode {
    /// Choose between splitting elements and raising their degree.
    Hp,
    /// Always split elements, keeping the degree.
    H,
    /// Always raise the degree by one.
    P,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AdaptSettings {
    pub mode: AdaptMode,
    /// Elements with error above `threshold * max error` are refined.
    pub threshold: f64,
    pub norm: Norm,
    pub max_degree: usize,
}

impl Default for AdaptSettings {
    fn default() -> Self {
        Self {
            mode: AdaptMode::Hp,
            threshold: 0.7,
            norm: Norm::H1,
            max_degree: 10,
        }
    }
}

/// Returns the indices of all elements whose error exceeds `threshold` times the largest
/// element error.
pub fn select_elements(errors: &[f64], threshold: f64) -> Vec<usize> {
    let max_error = errors.iter().copied().fold(0.0, f64::max);
    errors
        .iter()
        .enumerate()
        .filter(|(_, &error)| error > threshold * max_error)
        .map(|(index, _)| index)
        .collect()
}

/// The candidate refinements of an element of the given degree.
///
/// Candidates exceeding `max_degree` or not adding any DOFs are not included.
pub fn candidate_refinements(mode: AdaptMode, degree: usize, max_degree: usize) -> Vec<ElementRefinement> {
    use ElementRefinement::{Degree, Split};
    let p = degree;
    let candidates = match mode {
        AdaptMode::P => vec![Degree(p + 1)],
        AdaptMode::H => vec![Split([p, p])],
        AdaptMode::Hp => {
            let low = p.saturating_sub(1).max(1);
            let mut candidates = vec![Degree(p + 1), Degree(p + 2)];
            for p_left in low..=p + 1 {
                for p_right in low..=p + 1 {
                    // Splitting with both degrees raised is the reference refinement itself,
                    // which would always win with a vanishing error
                    if [p_left, p_right] != [p + 1, p + 1] {
                        candidates.push(Split([p_left, p_right]));
                    }
                }
            }
            candidates
        }
    };

    candidates
        .into_iter()
        .filter(|candidate| match *candidate {
            Degree(q) => q <= max_degree,
            Split([p_left, p_right]) => p_left.max(p_right) <= max_degree,
            ElementRefinement::Keep => false,
        })
        .filter(|candidate| candidate.dof_increase(p) > 0)
        .collect()
}

/// The squared error of the projection-based interpolant of the reference solution onto an
/// interval with the given degree.
fn interpolation_error_squared(norm: Norm, reference: &Space, interval: [f64; 2], degree: usize) -> f64 {
    let element = Element::detached(interval, interpolate_element(reference, interval, degree));
    element_error_squared(norm, &element, reference)
}

/// A candidate refinement together with its predicted quality.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Candidate {
    pub refinement: ElementRefinement,
    /// The error of the interpolant of the reference solution on the candidate.
    pub error: f64,
    /// DOFs per component added by the candidate.
    pub dof_increase: usize,
    /// `ln(current error / candidate error) / dof_increase`.
    pub score: f64,
}

/// Evaluates all candidates for the given element and returns the one with the highest
/// score, or `None` if there are no admissible candidates.
pub fn best_candidate(settings: &AdaptSettings, element: &Element, reference: &Space) -> Option<Candidate> {
    let degree = element.degree();
    let interval = element.interval();
    let current_error = interpolation_error_squared(settings.norm, reference, interval, degree)
        .max(0.0)
        .sqrt()
        .max(MIN_CANDIDATE_ERROR);

    let mut best: Option<Candidate> = None;
    for refinement in candidate_refinements(settings.mode, degree, settings.max_degree) {
        let error = refinement
            .cells(interval, degree)
            .into_iter()
            .map(|(cell, cell_degree)| interpolation_error_squared(settings.norm, reference, cell, cell_degree))
            .sum::<f64>()
            .max(0.0)
            .sqrt()
            .max(MIN_CANDIDATE_ERROR);
        let dof_increase = refinement.dof_increase(degree) as usize;
        let score = (current_error / error).ln() / dof_increase as f64;
        debug!(
            "Candidate {:?} for element {:?}: error {:e}, score {}",
            refinement, interval, error, score
        );
        if best.map_or(true, |best| score > best.score) {
            best = Some(Candidate {
                refinement,
                error,
                dof_increase,
                score,
            });
        }
    }
    best
}

/// Builds the refinement plan for the coarse space.
pub fn refinement_plan(
    settings: &AdaptSettings,
    errors: &[f64],
    coarse: &Space,
    reference: &Space,
) -> Vec<ElementRefinement> {
    assert_eq!(errors.len(), coarse.num_elements(), "Need one error per coarse element");
    let mut plan = vec![ElementRefinement::Keep; coarse.num_elements()];
    for index in select_elements(errors, settings.threshold) {
        let element = &coarse.elements()[index];
        match best_candidate(settings, element, reference) {
            Some(candidate) => plan[index] = candidate.refinement,
            None => warn!(
                "No admissible refinement for element {} of degree {} (max degree {})",
                index,
                element.degree(),
                settings.max_degree
            ),
        }
    }
    plan
}

/// Refines the selected elements of `coarse` and transfers the reference solution onto the
/// new coarse space. Returns the number of refined elements.
pub fn adapt(settings: &AdaptSettings, errors: &[f64], coarse: &mut Space, reference: &Space) -> usize {
    let plan = refinement_plan(settings, errors, coarse, reference);
    let num_refined = plan
        .iter()
        .filter(|refinement| **refinement != ElementRefinement::Keep)
        .count();
    let refined = coarse.refine(&plan, reference);
    info!(
        "Refined {} of {} elements: {} -> {} DOFs",
        num_refined,
        coarse.num_elements(),
        coarse.num_dofs(),
        refined.num_dofs()
    );
    *coarse = refined;
    num_refined
}
