//! Integration of piecewise polynomials over overlaid partitions.
//!
//! Functions living on two different spaces over the same domain are smooth only between the
//! breakpoints of *both* partitions. Integrals over an element of one space are therefore
//! computed segment by segment, splitting the element at the breakpoints of the other space,
//! which makes Gauss quadrature exact for products of piecewise polynomials.
use crate::quadrature::{gauss, map_to_interval};
use crate::space::Space;
use itertools::Itertools;

/// Breakpoints closer than this (relative to the interval length) to an end of the interval
/// are not split at.
const BREAKPOINT_TOLERANCE: f64 = 1e-12;

/// Splits `interval` at every breakpoint lying strictly inside it.
pub fn segments_within(breakpoints: &[f64], interval: [f64; 2]) -> Vec<[f64; 2]> {
    let [a, b] = interval;
    let tolerance = BREAKPOINT_TOLERANCE * (b - a).abs().max(1.0);
    let interior = breakpoints
        .iter()
        .copied()
        .filter(|&x| x > a + tolerance && x < b - tolerance);

    std::iter::once(a)
        .chain(interior)
        .chain(std::iter::once(b))
        .tuple_windows()
        .map(|(x0, x1)| [x0, x1])
        .collect()
}

/// Splits an element interval at the breakpoints of `other`, so that both the element's
/// polynomials and the solution of `other` are smooth on every segment.
pub fn overlay_segments(other: &Space, interval: [f64; 2]) -> Vec<[f64; 2]> {
    segments_within(&other.breakpoints(), interval)
}

/// Integrates `f` over `[a, b]` with an `num_points`-point Gauss rule.
pub fn integrate_over_interval(interval: [f64; 2], num_points: usize, mut f: impl FnMut(f64) -> f64) -> f64 {
    let (weights, points) = map_to_interval(&gauss(num_points), interval);
    weights.iter().zip(&points).map(|(w, x)| w * f(*x)).sum()
}
