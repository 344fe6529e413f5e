//! Piecewise polynomial spaces over a partition of an interval.
//!
//! A [`Space`] is the durable store of a discrete solution: every element holds its polynomial
//! degree together with the coefficients of all solution components with respect to the
//! hierarchic basis in [`crate::basis`]. The global coefficient vector used by the solvers is
//! only a working copy, obtained through [`Space::coefficients`] and written back through
//! [`Space::set_coefficients`].
use crate::basis::{num_shape_functions, populate_shape_functions};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

mod refinement;

pub use refinement::*;

/// A prescribed value for one solution component at one end of the domain.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirichletBc {
    pub equation: usize,
    pub value: f64,
}

impl DirichletBc {
    pub fn new(equation: usize, value: f64) -> Self {
        Self { equation, value }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConditions {
    #[serde(default)]
    pub left: Vec<DirichletBc>,
    #[serde(default)]
    pub right: Vec<DirichletBc>,
}

impl BoundaryConditions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_left(mut self, bc: DirichletBc) -> Self {
        self.left.push(bc);
        self
    }

    pub fn with_right(mut self, bc: DirichletBc) -> Self {
        self.right.push(bc);
        self
    }

    fn left_value(&self, equation: usize) -> Option<f64> {
        self.left
            .iter()
            .rev()
            .find(|bc| bc.equation == equation)
            .map(|bc| bc.value)
    }

    fn right_value(&self, equation: usize) -> Option<f64> {
        self.right
            .iter()
            .rev()
            .find(|bc| bc.equation == equation)
            .map(|bc| bc.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpaceError {
    InvalidDomain { a: f64, b: f64 },
    NoElements,
    /// The element intervals do not form a partition of the domain.
    InvalidPartition,
    ZeroDegree,
    NoEquations,
    InvalidBoundaryCondition { equation: usize, num_equations: usize },
}

impl Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { a, b } => write!(f, "Invalid domain [{}, {}]: expected finite a < b.", a, b),
            Self::NoElements => write!(f, "A space needs at least one element."),
            Self::InvalidPartition => write!(f, "Element intervals must be contiguous and cover the domain."),
            Self::ZeroDegree => write!(f, "Polynomial degrees must be at least 1."),
            Self::NoEquations => write!(f, "A space needs at least one equation."),
            Self::InvalidBoundaryCondition { equation, num_equations } => write!(
                f,
                "Boundary condition refers to equation {}, but there are only {} equations.",
                equation, num_equations
            ),
        }
    }
}

impl Error for SpaceError {}

/// A single element of a [`Space`].
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    interval: [f64; 2],
    degree: usize,
    // num_equations x (degree + 1), columns ordered like the shape functions
    coefficients: DMatrix<f64>,
    // Global DOF index of coefficient (c, k) at c * (degree + 1) + k, or None for
    // Dirichlet vertex coefficients
    dofs: Vec<Option<usize>>,
}

impl Element {
    fn new(interval: [f64; 2], degree: usize, num_equations: usize) -> Self {
        let n = num_shape_functions(degree);
        Self {
            interval,
            degree,
            coefficients: DMatrix::zeros(num_equations, n),
            dofs: vec![None; num_equations * n],
        }
    }

    /// An element that is not part of any space, with the given coefficients of degree
    /// `coefficients.ncols() - 1`.
    pub(crate) fn detached(interval: [f64; 2], coefficients: DMatrix<f64>) -> Self {
        assert!(coefficients.ncols() >= 2, "Elements must have degree at least 1");
        let degree = coefficients.ncols() - 1;
        Self {
            interval,
            degree,
            dofs: vec![None; coefficients.len()],
            coefficients,
        }
    }

    pub fn interval(&self) -> [f64; 2] {
        self.interval
    }

    pub fn length(&self) -> f64 {
        self.interval[1] - self.interval[0]
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn num_equations(&self) -> usize {
        self.coefficients.nrows()
    }

    /// The coefficients of all components, one row per component.
    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }

    /// The global DOF index of shape function `k` of the given component, if it is a DOF.
    pub fn dof(&self, component: usize, k: usize) -> Option<usize> {
        self.dofs[component * num_shape_functions(self.degree) + k]
    }

    /// Maps a reference coordinate in `[-1, 1]` to the element.
    pub fn map_reference_coords(&self, xi: f64) -> f64 {
        let [a, b] = self.interval;
        0.5 * (a + b) + 0.5 * (b - a) * xi
    }

    pub fn map_physical_coords(&self, x: f64) -> f64 {
        let [a, b] = self.interval;
        (2.0 * x - a - b) / (b - a)
    }

    /// `dx/dξ`.
    pub fn jacobian(&self) -> f64 {
        0.5 * self.length()
    }

    /// Evaluates the values and (physical) derivatives of all components at a reference
    /// coordinate.
    pub fn evaluate_reference(&self, xi: f64) -> (DVector<f64>, DVector<f64>) {
        let n = num_shape_functions(self.degree);
        let mut phi = vec![0.0; n];
        let mut dphi = vec![0.0; n];
        populate_shape_functions(self.degree, xi, &mut phi, &mut dphi);
        let phi = DVector::from_vec(phi);
        let dphi = DVector::from_vec(dphi) / self.jacobian();
        (&self.coefficients * phi, &self.coefficients * dphi)
    }
}

/// A piecewise polynomial space with `num_equations` components over a partition of `[a, b]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    domain: [f64; 2],
    num_equations: usize,
    boundary_conditions: BoundaryConditions,
    elements: Vec<Element>,
    num_dofs: usize,
}

impl Space {
    /// Creates a space of `num_elements` equally sized elements of the given degree.
    ///
    /// All coefficients are zero, except those of Dirichlet vertices, which hold the
    /// prescribed values.
    pub fn new(
        domain: [f64; 2],
        num_elements: usize,
        degree: usize,
        num_equations: usize,
        boundary_conditions: &BoundaryConditions,
    ) -> Result<Self, SpaceError> {
        let [a, b] = domain;
        if num_elements == 0 {
            return Err(SpaceError::NoElements);
        }

        let h = (b - a) / num_elements as f64;
        let cells = (0..num_elements).map(|i| {
            let x0 = a + i as f64 * h;
            // Hit the right end of the domain exactly
            let x1 = if i + 1 == num_elements { b } else { a + (i + 1) as f64 * h };
            ([x0, x1], degree)
        });
        Self::from_cells(domain, num_equations, boundary_conditions.clone(), cells)
    }

    /// Creates a space from a sequence of contiguous `(interval, degree)` cells covering the
    /// domain, with zero coefficients (apart from Dirichlet values).
    pub fn from_cells(
        domain: [f64; 2],
        num_equations: usize,
        boundary_conditions: BoundaryConditions,
        cells: impl IntoIterator<Item = ([f64; 2], usize)>,
    ) -> Result<Self, SpaceError> {
        let [a, b] = domain;
        if !(a.is_finite() && b.is_finite() && a < b) {
            return Err(SpaceError::InvalidDomain { a, b });
        }
        if num_equations == 0 {
            return Err(SpaceError::NoEquations);
        }
        for bc in boundary_conditions.left.iter().chain(&boundary_conditions.right) {
            if bc.equation >= num_equations {
                return Err(SpaceError::InvalidBoundaryCondition {
                    equation: bc.equation,
                    num_equations,
                });
            }
        }

        let mut elements = Vec::new();
        for (interval, degree) in cells {
            if degree == 0 {
                return Err(SpaceError::ZeroDegree);
            }
            elements.push(Element::new(interval, degree, num_equations));
        }
        if elements.is_empty() {
            return Err(SpaceError::NoElements);
        }
        let mut expected_start = a;
        for element in &elements {
            let [x0, x1] = element.interval;
            if x0 != expected_start || !(x0 < x1) {
                return Err(SpaceError::InvalidPartition);
            }
            expected_start = x1;
        }
        if expected_start != b {
            return Err(SpaceError::InvalidPartition);
        }

        Ok(Self::from_elements(domain, num_equations, boundary_conditions, elements))
    }

    fn from_elements(
        domain: [f64; 2],
        num_equations: usize,
        boundary_conditions: BoundaryConditions,
        elements: Vec<Element>,
    ) -> Self {
        let mut space = Self {
            domain,
            num_equations,
            boundary_conditions,
            elements,
            num_dofs: 0,
        };
        space.assign_dofs();
        space.apply_dirichlet_values();
        space
    }

    /// Numbers the DOFs element by element, left to right, and component by component.
    /// A vertex shared by two elements carries the same DOF in both.
    fn assign_dofs(&mut self) {
        let num_elements = self.elements.len();
        let mut next = 0;
        // DOF of the right vertex of the previous element, per component
        let mut shared = vec![None; self.num_equations];
        for (e, element) in self.elements.iter_mut().enumerate() {
            let n = num_shape_functions(element.degree);
            for c in 0..self.num_equations {
                let mut new_dof = || {
                    next += 1;
                    Some(next - 1)
                };
                let left = if e == 0 {
                    match self.boundary_conditions.left_value(c) {
                        Some(_) => None,
                        None => new_dof(),
                    }
                } else {
                    shared[c]
                };
                let right = if e + 1 == num_elements && self.boundary_conditions.right_value(c).is_some() {
                    None
                } else {
                    new_dof()
                };
                element.dofs[c * n] = left;
                element.dofs[c * n + 1] = right;
                for k in 2..n {
                    element.dofs[c * n + k] = new_dof();
                }
                shared[c] = right;
            }
        }
        self.num_dofs = next;
    }

    fn apply_dirichlet_values(&mut self) {
        for c in 0..self.num_equations {
            if let Some(value) = self.boundary_conditions.left_value(c) {
                if let Some(first) = self.elements.first_mut() {
                    first.coefficients[(c, 0)] = value;
                }
            }
            if let Some(value) = self.boundary_conditions.right_value(c) {
                if let Some(last) = self.elements.last_mut() {
                    last.coefficients[(c, 1)] = value;
                }
            }
        }
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn num_equations(&self) -> usize {
        self.num_equations
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    pub fn boundary_conditions(&self) -> &BoundaryConditions {
        &self.boundary_conditions
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn degrees(&self) -> Vec<usize> {
        self.elements.iter().map(Element::degree).collect()
    }

    /// The element vertices, from `a` to `b`.
    pub fn breakpoints(&self) -> Vec<f64> {
        let mut points = Vec::with_capacity(self.elements.len() + 1);
        points.push(self.domain[0]);
        points.extend(self.elements.iter().map(|element| element.interval[1]));
        points
    }

    /// Gathers the global coefficient vector from the elements.
    pub fn coefficients(&self) -> DVector<f64> {
        let mut x = DVector::zeros(self.num_dofs);
        for element in &self.elements {
            let n = num_shape_functions(element.degree);
            for c in 0..self.num_equations {
                for k in 0..n {
                    if let Some(dof) = element.dofs[c * n + k] {
                        x[dof] = element.coefficients[(c, k)];
                    }
                }
            }
        }
        x
    }

    /// Scatters a global coefficient vector into the elements. Dirichlet values are untouched.
    ///
    /// # Panics
    ///
    /// Panics if the length of `x` is not the number of DOFs.
    pub fn set_coefficients(&mut self, x: &DVector<f64>) {
        assert_eq!(x.len(), self.num_dofs, "Coefficient vector length must match number of DOFs");
        for element in &mut self.elements {
            let n = num_shape_functions(element.degree);
            for c in 0..self.num_equations {
                for k in 0..n {
                    if let Some(dof) = element.dofs[c * n + k] {
                        element.coefficients[(c, k)] = x[dof];
                    }
                }
            }
        }
    }

    /// Returns the index of the element containing `x`.
    ///
    /// A point on an interior vertex belongs to the element on its left. Returns `None`
    /// for points outside the domain.
    pub fn locate(&self, x: f64) -> Option<usize> {
        let [a, b] = self.domain;
        if !(a <= x && x <= b) {
            return None;
        }
        let index = self.elements.partition_point(|element| element.interval[1] < x);
        Some(index.min(self.elements.len() - 1))
    }

    /// The element containing `x`, with points outside the domain clamped to the first or
    /// last element.
    pub(crate) fn element_at(&self, x: f64) -> &Element {
        let index = self.elements.partition_point(|element| element.interval[1] < x);
        &self.elements[index.min(self.elements.len() - 1)]
    }

    /// Evaluates values and derivatives of all components at `x`.
    pub fn evaluate(&self, x: f64) -> Option<(DVector<f64>, DVector<f64>)> {
        self.locate(x).map(|index| {
            let element = &self.elements[index];
            element.evaluate_reference(element.map_physical_coords(x))
        })
    }

    /// Builds the reference space: every element is split into halves of one degree higher.
    ///
    /// The reference space contains the current space, so the solution is transferred exactly.
    pub fn refine_globally(&self) -> Space {
        let plan: Vec<_> = self
            .elements
            .iter()
            .map(|element| ElementRefinement::Split([element.degree + 1; 2]))
            .collect();
        self.refine(&plan, self)
    }
}
