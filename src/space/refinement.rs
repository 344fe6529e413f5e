use crate::projection::interpolate_element;
use crate::space::{Element, Space};
use serde::{Deserialize, Serialize};

/// How a single element is replaced when refining a [`Space`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementRefinement {
    Keep,
    /// Keep the interval, change the degree.
    Degree(usize),
    /// Split the interval in halves with the given degrees.
    Split([usize; 2]),
}

impl ElementRefinement {
    /// The intervals and degrees of the elements replacing an element with the given interval
    /// and degree.
    pub fn cells(&self, interval: [f64; 2], degree: usize) -> Vec<([f64; 2], usize)> {
        let [a, b] = interval;
        match *self {
            Self::Keep => vec![(interval, degree)],
            Self::Degree(p) => vec![(interval, p)],
            Self::Split([p_left, p_right]) => {
                let midpoint = 0.5 * (a + b);
                vec![([a, midpoint], p_left), ([midpoint, b], p_right)]
            }
        }
    }

    /// The number of DOFs per component added (or removed, if negative) by replacing an
    /// element of the given degree, ignoring boundary conditions.
    pub fn dof_increase(&self, degree: usize) -> isize {
        let degree = degree as isize;
        match *self {
            Self::Keep => 0,
            Self::Degree(p) => p as isize - degree,
            // A split introduces one vertex, and each half has p - 1 bubbles
            Self::Split([p_left, p_right]) => (p_left + p_right) as isize - degree,
        }
    }
}

impl Space {
    /// Builds a new space by applying `plan` to every element of this space.
    ///
    /// The solution held by `source` (typically this space, or a reference space over the
    /// same domain) is transferred to the new space by projection-based interpolation,
    /// element by element. Dirichlet values are prescribed exactly.
    ///
    /// # Panics
    ///
    /// Panics if the plan does not have one entry per element, if it requests a zero degree,
    /// or if `source` has a different number of equations.
    pub fn refine(&self, plan: &[ElementRefinement], source: &Space) -> Space {
        assert_eq!(plan.len(), self.num_elements(), "Refinement plan must have one entry per element");
        assert_eq!(source.num_equations(), self.num_equations(), "Source must have the same number of equations");

        let elements: Vec<_> = self
            .elements
            .iter()
            .zip(plan)
            .flat_map(|(element, refinement)| refinement.cells(element.interval, element.degree))
            .map(|(interval, degree)| {
                assert!(degree >= 1, "Refined degree must be at least 1");
                let mut element = Element::new(interval, degree, self.num_equations);
                element.coefficients = interpolate_element(source, interval, degree);
                element
            })
            .collect();

        Space::from_elements(self.domain, self.num_equations, self.boundary_conditions.clone(), elements)
    }
}
