//! Strategies for generating spaces and solutions in property-based tests.
use crate::space::{BoundaryConditions, DirichletBc, Space};
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use nalgebra::DVector;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceParams {
    pub max_elements: usize,
    pub max_degree: usize,
    pub num_equations: usize,
    pub with_boundary_conditions: bool,
}

impl Default for SpaceParams {
    fn default() -> Self {
        Self {
            max_elements: 5,
            max_degree: 5,
            num_equations: 2,
            with_boundary_conditions: true,
        }
    }
}

/// Generates non-uniform partitions of `[0, 1]` into at most `max_elements` elements.
pub fn partition(max_elements: usize) -> impl Strategy<Value = Vec<[f64; 2]>> {
    assert!(max_elements > 0);
    vec(0.2..1.0f64, 1..=max_elements).prop_map(|lengths| {
        let total: f64 = lengths.iter().sum();
        let mut x0 = 0.0;
        let num_elements = lengths.len();
        lengths
            .iter()
            .enumerate()
            .map(|(i, length)| {
                // End exactly at the domain boundary
                let x1 = if i + 1 == num_elements { 1.0 } else { x0 + length / total };
                let interval = [x0, x1];
                x0 = x1;
                interval
            })
            .collect()
    })
}

/// Generates spaces over `[0, 1]` with zero solution, Dirichlet values aside.
pub fn space(params: SpaceParams) -> impl Strategy<Value = Space> {
    let SpaceParams {
        max_elements,
        max_degree,
        num_equations,
        with_boundary_conditions,
    } = params;
    assert!(max_degree >= 1);
    partition(max_elements)
        .prop_flat_map(move |intervals| {
            let n = intervals.len();
            let degrees = vec(1..=max_degree, n);
            let left = vec(prop::option::of(-2.0..2.0f64), num_equations);
            let right = vec(prop::option::of(-2.0..2.0f64), num_equations);
            (Just(intervals), degrees, left, right)
        })
        .prop_map(move |(intervals, degrees, left, right)| {
            let mut bcs = BoundaryConditions::none();
            if with_boundary_conditions {
                for (equation, value) in left.into_iter().enumerate() {
                    if let Some(value) = value {
                        bcs = bcs.with_left(DirichletBc::new(equation, value));
                    }
                }
                for (equation, value) in right.into_iter().enumerate() {
                    if let Some(value) = value {
                        bcs = bcs.with_right(DirichletBc::new(equation, value));
                    }
                }
            }
            Space::from_cells([0.0, 1.0], num_equations, bcs, intervals.into_iter().zip(degrees))
                .expect("Generated cells always form a valid space")
        })
}

/// Generates spaces holding a random solution.
pub fn space_with_solution(params: SpaceParams) -> impl Strategy<Value = Space> {
    space(params)
        .prop_flat_map(|space| {
            let n = space.num_dofs();
            (Just(space), vec(-5.0..5.0f64, n))
        })
        .prop_map(|(mut space, coefficients)| {
            space.set_coefficients(&DVector::from_vec(coefficients));
            space
        })
}
