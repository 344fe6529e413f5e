//! Scalar traits shared by the generic `hpadapt` crates.
use nalgebra::RealField;

pub use nalgebra;

/// Real scalar that can be copied freely, e.g. `f32` or `f64`.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
