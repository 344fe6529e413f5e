//! Dual-mesh hp-adaptive finite element solution of nonlinear systems of first-order
//! equations in one dimension.
//!
//! The central entry point is [`adaptivity::AdaptiveLoop`]. It solves the problem given by a
//! [`weak_form::WeakForm`] with Newton's method on a coarse [`space::Space`] and on a globally
//! refined reference space, estimates the coarse error from the difference, and refines the
//! coarse space until the estimated error is small enough.
pub mod adapt;
pub mod adaptivity;
pub mod assembly;
pub mod basis;
pub mod convergence;
pub mod error;
pub mod integrate;
pub mod linear_solver;
pub mod problems;
pub mod projection;
pub mod space;
pub mod weak_form;

pub mod optimize {
    pub use hpadapt_optimize::*;
}

pub mod quadrature {
    pub use hpadapt_quadrature::*;
}

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use hpadapt_traits::Real;
