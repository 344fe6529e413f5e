mod convergence;
mod projection;
