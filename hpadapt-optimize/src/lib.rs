/// Traits describing nonlinear systems and the linear solvers used to step them
pub mod system;
/// Newton's method with a bounded number of iterations
pub mod newton;
